pub mod dispatcher;
pub mod evaluator;
pub mod success_rate;

pub use dispatcher::AlertDispatcher;
pub use evaluator::{AlertEvaluator, EvaluatorOptions};
pub use success_rate::SuccessRate;
