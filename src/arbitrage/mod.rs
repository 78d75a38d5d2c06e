pub mod dispatcher;
pub mod engine;
pub mod evaluator;
pub mod finder;
pub mod result_map;
