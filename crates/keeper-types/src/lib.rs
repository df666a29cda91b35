mod address;
mod round;
mod command;
mod payout;
mod clock;
mod error;

pub use address::{find_program_address, create_program_address, pot_address, Address, POT_SEED};
pub use round::{RoundSnapshot, RoundState, UnixTimestamp};
pub use command::TransitionCommand;
pub use payout::{PayoutPlan, PayoutSplit};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{KeeperError, Result};
