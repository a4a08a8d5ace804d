mod model_loaders;

pub use model_loaders::load_todo_middleware;
