/// Asynchronous inputs the controller waits on between user actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeSignal {
    Tick { generation: u64 },
    HoldElapsed { generation: u64 },
}
