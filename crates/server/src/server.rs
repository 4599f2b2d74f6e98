use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;

use crate::routes::{route, AppState};

/// Accepts connections until `shutdown` resolves, then waits up to `grace`
/// for in-flight requests to finish.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
    grace: Duration,
) -> std::io::Result<()>
where
    F: Future<Output = ()>,
{
    let graceful = GracefulShutdown::new();
    tokio::pin!(shutdown);

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    log::error!("Failed to accept connection: {e}");
                    continue;
                }
            },
            _ = &mut shutdown => break,
        };

        let state = Arc::clone(&state);
        let service = service_fn(move |req: Request<Incoming>| {
            let state = Arc::clone(&state);
            async move { Ok::<_, Infallible>(route(req, state).await) }
        });
        let connection = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        let connection = graceful.watch(connection);

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                log::debug!("Error serving connection from {remote_addr}: {e}");
            }
        });
    }

    log::info!("Shutting down, waiting up to {grace:?} for open requests");
    tokio::select! {
        _ = graceful.shutdown() => log::info!("All connections closed"),
        _ = tokio::time::sleep(grace) => log::warn!("Grace period elapsed with connections still open"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::analysis::domain::analysis::{Analysis, GazeDirection, GazeRatios, GazeReading, Pupils};
    use proctor_core::analysis::domain::frame_analyzer::{FrameAnalyzer, Job};
    use proctor_core::dispatch::dispatcher::Engine;
    use proctor_core::service::analysis_service::{AnalysisService, ServiceConfig};
    use proctor_core::service::service_kind::ServiceKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    struct CenterGaze;

    impl FrameAnalyzer for CenterGaze {
        fn analyze(&mut self, _job: &Job) -> Result<Analysis, Box<dyn std::error::Error>> {
            Ok(Analysis::Gaze(GazeReading {
                gaze_direction: GazeDirection::Center,
                gaze_text: GazeDirection::Center.text(),
                confidence: 1.0,
                pupils: Pupils::default(),
                ratios: GazeRatios::default(),
                face_detected: true,
            }))
        }
    }

    async fn get(addr: std::net::SocketAddr, path: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let service = AnalysisService::start(ServiceConfig::new(ServiceKind::Gaze, 1), |_, _| {
            Ok(Box::new(CenterGaze) as Engine)
        })
        .unwrap();
        let state = Arc::new(AppState {
            service: Arc::new(service),
            max_body_bytes: 1024,
        });

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            state,
            async move {
                let _ = stop_rx.await;
            },
            Duration::from_secs(1),
        ));

        let health = get(addr, "/health").await;
        assert!(health.starts_with("HTTP/1.1 200"));
        assert!(health.contains("\"status\":\"healthy\""));

        let missing = get(addr, "/missing").await;
        assert!(missing.starts_with("HTTP/1.1 404"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
