// Signal handling, in its own test binary so the signal only reaches it

use sitemapper::cancel_on_shutdown;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

#[cfg(unix)]
#[tokio::test]
async fn test_sigterm_cancels_crawl() {
    let cancel = CancellationToken::new();
    let listener = cancel_on_shutdown(cancel.clone()).unwrap();

    let status = std::process::Command::new("kill")
        .args(["-TERM", &std::process::id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    timeout(Duration::from_secs(5), cancel.cancelled())
        .await
        .expect("SIGTERM should cancel the crawl");
    listener.await.unwrap();
}
