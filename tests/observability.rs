use async_trait::async_trait;
use behavior_pipeline::{
    Capabilities, Handler, IntervalChecked, Pipeline, Principal, Request, RequestContext, Result,
};
use serde::Serialize;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Formatted tracing output shared between the subscriber and the test.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    fn line_containing(&self, needle: &str) -> Option<String> {
        self.text()
            .lines()
            .find(|line| line.contains(needle))
            .map(str::to_string)
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[derive(Serialize)]
struct AuditBrand {
    name: String,
    #[serde(skip)]
    delay: Duration,
}

impl AuditBrand {
    fn taking(delay: Duration) -> Self {
        Self {
            name: "Acme".to_string(),
            delay,
        }
    }
}

impl Request for AuditBrand {
    type Response = u64;
    const CAPABILITIES: Capabilities = Capabilities::LOGGABLE.with(Capabilities::INTERVAL_CHECKED);

    fn as_interval_checked(&self) -> Option<&dyn IntervalChecked> {
        Some(self)
    }
}

impl IntervalChecked for AuditBrand {
    fn interval(&self) -> Duration {
        Duration::from_secs(5)
    }
}

struct Audit;

#[async_trait]
impl Handler<AuditBrand> for Audit {
    async fn handle(&self, req: &AuditBrand, _: &RequestContext) -> Result<u64> {
        tokio::time::sleep(req.delay).await;
        Ok(7)
    }
}

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .handler::<AuditBrand, _>(Audit)
        .build()
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_slow_call_emits_performance_warning() {
    let (captured, _guard) = capture();

    let id = pipeline()
        .send(&AuditBrand::taking(Duration::from_secs(6)), &RequestContext::new())
        .await
        .unwrap();
    assert_eq!(id, 7);

    let line = captured
        .line_containing("Performance -> AuditBrand took ")
        .expect("slow call was not reported");
    assert!(line.contains("WARN"), "{}", line);
    assert!(line.contains("interval_ms=5000"), "{}", line);
    assert!(line.contains("elapsed_ms=6"), "{}", line);
    assert!(line.contains("succeeded=true"), "{}", line);
    assert!(
        line.contains(r#""method_name":"Audit""#),
        "{}",
        line
    );
    assert!(line.contains(r#""user":"PerformanceCheck""#), "{}", line);
}

#[tokio::test(start_paused = true)]
async fn test_fast_call_emits_no_performance_warning() {
    let (captured, _guard) = capture();

    pipeline()
        .send(&AuditBrand::taking(Duration::from_secs(1)), &RequestContext::new())
        .await
        .unwrap();

    assert!(captured.line_containing("Handling request").is_some());
    assert!(
        captured.line_containing("Performance ->").is_none(),
        "{}",
        captured.text()
    );
}

#[tokio::test(start_paused = true)]
async fn test_logging_record_names_handler_request_and_user() {
    let (captured, _guard) = capture();
    let ctx = RequestContext::new().with_identity(Principal::new("ada"));

    pipeline()
        .send(&AuditBrand::taking(Duration::ZERO), &ctx)
        .await
        .unwrap();

    let line = captured
        .line_containing("Handling request")
        .expect("call was not logged");
    assert!(line.contains("INFO"), "{}", line);
    assert!(line.contains("handler=Audit"), "{}", line);
    assert!(line.contains("user=ada"), "{}", line);
    assert!(
        line.contains(
            r#"{"method_name":"Audit","parameters":[{"type":"AuditBrand","value":{"name":"Acme"}}],"user":"ada"}"#
        ),
        "{}",
        line
    );
}

#[tokio::test(start_paused = true)]
async fn test_anonymous_caller_is_logged_as_question_mark() {
    let (captured, _guard) = capture();

    pipeline()
        .send(&AuditBrand::taking(Duration::ZERO), &RequestContext::new())
        .await
        .unwrap();

    let line = captured
        .line_containing("Handling request")
        .expect("call was not logged");
    assert!(line.contains("user=?"), "{}", line);
    assert!(line.contains(r#""user":"?""#), "{}", line);
}
