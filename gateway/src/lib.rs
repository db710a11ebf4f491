pub mod error;
pub mod handlers;
pub mod message_view;
pub mod router;
pub mod server;

pub use error::GatewayError;
pub use router::{Route, Router, RouterError};
pub use server::GatewayServer;

use bg_common::constants::{SLOT_RAM_0, SLOT_RAM_1};
use bg_storage::StorageRegistry;
use bg_update::UpdateTrigger;
use bg_vm_interface::ExecutionEngine;
use coap_lite::RequestType;
use handlers::{
    board::BoardHandler, exec::ExecutionGatewayHandler, pull::UpdateTriggerHandler,
    suit::SuitStorageHandler, well_known::WellKnownCoreHandler,
};
use std::sync::Arc;

/// Assembles the gateway's fixed route table. Paths are registered in
/// ascending order; `Router::new` re-checks that at startup.
pub fn build_router(
    storage: Arc<StorageRegistry>,
    engine: Arc<ExecutionEngine>,
    trigger: UpdateTrigger,
    board_name: String,
    branch_budget: u32,
) -> Result<Router, RouterError> {
    let exec = Arc::new(ExecutionGatewayHandler::new(
        storage.clone(),
        engine,
        branch_budget,
    ));

    let mut routes = vec![
        Route::exact_with_slot(RequestType::Post, "/bpf/exec/0", SLOT_RAM_0, exec.clone()),
        Route::exact_with_slot(RequestType::Post, "/bpf/exec/1", SLOT_RAM_1, exec),
        Route::exact(
            RequestType::Post,
            "/pull",
            Arc::new(UpdateTriggerHandler::new(trigger)),
        ),
        Route::exact(
            RequestType::Get,
            "/riot/board",
            Arc::new(BoardHandler::new(board_name)),
        ),
        Route::subtree(
            RequestType::Post,
            "/suit",
            Arc::new(SuitStorageHandler::new(storage)),
        ),
    ];

    let mut paths: Vec<&'static str> = routes.iter().map(|r| r.path).collect();
    paths.push("/.well-known/core");
    routes.insert(
        0,
        Route::exact(
            RequestType::Get,
            "/.well-known/core",
            Arc::new(WellKnownCoreHandler::from_paths(&paths)),
        ),
    );

    Router::new(routes)
}
