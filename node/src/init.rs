use crate::gateway_node::GatewayNode;
use bg_common::constants::{
    DEFAULT_BOARD_NAME, DEFAULT_COAP_PORT, SLOT_RAM_0, SLOT_RAM_1, UPDATE_QUEUE_DEPTH,
};
use bg_gateway::{build_router, GatewayServer};
use bg_storage::{RamStorage, StorageRegistry};
use bg_update::{CoapFetchTransport, UpdateTrigger, UpdateWorker};
use bg_vm_interface::ExecutionEngine;
use bg_vm_types::constants::DEFAULT_BRANCH_BUDGET;
use std::{
    error::Error,
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

/// Wires up storage, engine, update pipeline, route table and socket.
pub async fn init_node(
    listen: Option<SocketAddr>,
    board: Option<String>,
    branch_budget: Option<u32>,
) -> Result<GatewayNode, Box<dyn Error>> {
    let listen =
        listen.unwrap_or_else(|| SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), DEFAULT_COAP_PORT));
    let board = board.unwrap_or_else(|| DEFAULT_BOARD_NAME.to_string());
    let branch_budget = branch_budget.unwrap_or(DEFAULT_BRANCH_BUDGET);

    let storage = Arc::new(StorageRegistry::new(vec![Arc::new(RamStorage::new(
        "ram",
        &[SLOT_RAM_0, SLOT_RAM_1],
    ))]));
    let engine = Arc::new(ExecutionEngine::new());

    let (trigger, jobs) = UpdateTrigger::channel(UPDATE_QUEUE_DEPTH);
    let update_worker =
        UpdateWorker::new(storage.clone(), Arc::new(CoapFetchTransport::new()), jobs);

    let router = Arc::new(build_router(
        storage.clone(),
        engine,
        trigger,
        board,
        branch_budget,
    )?);
    let server = GatewayServer::bind(listen, router).await?;

    Ok(GatewayNode {
        server,
        update_worker,
        storage,
    })
}
