//! Server Configuration

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address
    pub bind: String,

    /// Port number
    pub port: u16,

    /// Worker threads executing commands (0 = one per CPU)
    pub workers: usize,

    /// Pin each worker to its own CPU core
    pub pin_to_cores: bool,

    /// Pending commands accepted before clients get a queue-full error
    pub queue_capacity: usize,

    /// Cluster size used when a CLUSTER request omits k
    pub default_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 6390,
            workers: 0,
            pin_to_cores: false,
            queue_capacity: 10_000,
            default_k: 10,
        }
    }
}

impl Config {
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.bind = bind.into();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }

    /// Worker count with 0 resolved to the number of CPUs
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}
