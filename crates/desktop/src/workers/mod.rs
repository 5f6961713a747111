pub mod model_cache;
