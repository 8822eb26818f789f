mod browse_and_write;
mod stream_invoke;
