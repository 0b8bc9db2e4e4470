use futures::Stream;
#[cfg(unix)]
use futures::StreamExt;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SignalTo {
    /// Stop accepting requests and let in-flight ones finish.
    Shutdown,
    /// Exit immediately.
    Quit,
}

/// Signals from the OS, forever.
#[cfg(unix)]
pub fn signals() -> std::io::Result<impl Stream<Item = SignalTo>> {
    use tokio::signal::unix::{SignalKind, signal};

    let kinds = [
        (SignalKind::interrupt(), SignalTo::Shutdown),
        (SignalKind::terminate(), SignalTo::Shutdown),
        (SignalKind::quit(), SignalTo::Quit),
    ];

    let mut streams = Vec::with_capacity(kinds.len());
    for (kind, to) in kinds {
        let mut signal = signal(kind)?;
        streams.push(
            futures::stream::poll_fn(move |cx| signal.poll_recv(cx).map(|s| s.map(|()| to)))
                .boxed(),
        );
    }

    Ok(futures::stream::select_all(streams))
}

/// Signals from the OS, forever.
#[cfg(windows)]
pub fn signals() -> std::io::Result<impl Stream<Item = SignalTo>> {
    let mut ctrl_c = tokio::signal::windows::ctrl_c()?;
    Ok(futures::stream::poll_fn(move |cx| {
        ctrl_c.poll_recv(cx).map(|s| s.map(|()| SignalTo::Shutdown))
    }))
}
