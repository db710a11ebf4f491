//! Gateway-wide constants

/// Default CoAP listen port.
pub const DEFAULT_COAP_PORT: u16 = 5683;

/// Storage location id backing `/bpf/exec/0`.
pub const SLOT_RAM_0: &str = ".ram.0";

/// Storage location id backing `/bpf/exec/1`.
pub const SLOT_RAM_1: &str = ".ram.1";

/// Maximum size of one stored bytecode image in octets.
pub const SLOT_CAPACITY: usize = 2048;

/// Board name reported by `/riot/board` when none is configured.
pub const DEFAULT_BOARD_NAME: &str = "native";

/// Receive buffer size for inbound datagrams. Large enough for a full
/// image upload in a single message; blockwise transfers are not spoken.
pub const MAX_DATAGRAM_SIZE: usize = 4096;

/// Depth of the update-trigger queue between the gateway and the worker.
pub const UPDATE_QUEUE_DEPTH: usize = 4;
