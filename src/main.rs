use firehose_receiver::app::Application;

fn main() {
    let app = Application::prepare().unwrap_or_else(|code| {
        std::process::exit(code);
    });

    std::process::exit(app.run());
}
