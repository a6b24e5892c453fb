mod buffer_pool;

#[cfg(test)]
mod tests;

pub use buffer_pool::{BufferPool, BufferPoolBuilder};
