pub mod system;
pub mod tree;

use thiserror::Error;

pub use self::tree::tree_rss;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("process {0} has no children")]
    NoChildren(u32),

    #[error("process {0} is gone")]
    ProcessGone(u32),
}

/// Process introspection used by the sampler.
///
/// `refresh` is called once per sample; `descendants` and `rss` answer from
/// that refreshed view until the next call.
pub trait MemoryProbe {
    fn refresh(&mut self);

    /// Every live process below `pid`, at any depth. A process without
    /// children reports [`ProbeError::NoChildren`].
    fn descendants(&self, pid: u32) -> Result<Vec<u32>, ProbeError>;

    /// Resident set size in bytes.
    fn rss(&self, pid: u32) -> Result<u64, ProbeError>;
}

pub fn build_probe() -> Box<dyn MemoryProbe + Send> {
    Box::new(system::SystemProbe::new())
}
