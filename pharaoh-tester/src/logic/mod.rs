pub mod game_tester;
pub mod policy;
pub mod reports;
pub mod storage;
pub mod tester;

pub use policy::GameplayStrategy;
pub use storage::TesterStorage;
pub use tester::*;
