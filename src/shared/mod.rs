pub mod macros;
pub mod structs;

pub use structs::ControllerEvent;
pub use structs::Direction;
pub use structs::ElevatorInfo;
pub use structs::Order;
pub use structs::OrderKind;
