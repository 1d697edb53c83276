/// Receives one raw inbound payload.
pub type PayloadHandler = Box<dyn Fn(String) + Send + Sync>;

/// Boundary to whatever actually moves payloads between nearby nodes.
///
/// `broadcast` is best-effort and fire-and-forget; delivery failures stay
/// inside the transport. A transport with many peers still feeds a single
/// unified stream into the registered handler.
pub trait ChatTransport: Send + Sync {
    fn broadcast(&self, raw: &str);

    fn on_receive(&self, handler: PayloadHandler);
}
