use crate::{
    error::GatewayError,
    handlers::{Handler, Reply, Request},
};
use async_trait::async_trait;
use coap_lite::ResponseType;

/// `/.well-known/core` resource discovery, serving the route table as a
/// CoRE link-format listing.
pub struct WellKnownCoreHandler {
    links: String,
}

impl WellKnownCoreHandler {
    pub fn from_paths(paths: &[&str]) -> Self {
        let mut paths: Vec<&str> = paths.to_vec();
        paths.sort_unstable();
        let links = paths
            .iter()
            .map(|p| format!("<{p}>"))
            .collect::<Vec<_>>()
            .join(",");
        Self { links }
    }
}

#[async_trait]
impl Handler for WellKnownCoreHandler {
    async fn handle(&self, _req: Request<'_>) -> Result<Reply, GatewayError> {
        Ok(Reply::link_format(ResponseType::Content, &self.links))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_path_sorted() {
        let handler = WellKnownCoreHandler::from_paths(&["/riot/board", "/bpf/exec/0"]);
        assert_eq!(handler.links, "</bpf/exec/0>,</riot/board>");
    }
}
