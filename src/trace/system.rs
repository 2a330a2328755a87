use std::collections::{HashMap, HashSet, VecDeque};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::trace::{MemoryProbe, ProbeError};

/// `sysinfo`-backed probe. Each refresh rescans the whole process table so
/// children spawned since the last sample are picked up.
pub struct SystemProbe {
    system: System,
}

impl SystemProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn children_index(&self) -> HashMap<Pid, Vec<Pid>> {
        let mut index: HashMap<Pid, Vec<Pid>> = HashMap::new();
        for (pid, process) in self.system.processes() {
            // Threads share their leader's memory; counting them would
            // multiply it.
            if process.thread_kind().is_some() {
                continue;
            }
            if let Some(parent) = process.parent() {
                index.entry(parent).or_default().push(*pid);
            }
        }
        index
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for SystemProbe {
    fn refresh(&mut self) {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::new().with_memory(),
        );
    }

    fn descendants(&self, pid: u32) -> Result<Vec<u32>, ProbeError> {
        let root = Pid::from_u32(pid);
        if self.system.process(root).is_none() {
            return Err(ProbeError::ProcessGone(pid));
        }

        let index = self.children_index();
        let mut seen: HashSet<Pid> = HashSet::from([root]);
        let mut queue: VecDeque<Pid> = VecDeque::from([root]);
        let mut found = Vec::new();

        while let Some(current) = queue.pop_front() {
            let Some(kids) = index.get(&current) else {
                continue;
            };
            for kid in kids {
                if seen.insert(*kid) {
                    found.push(kid.as_u32());
                    queue.push_back(*kid);
                }
            }
        }

        if found.is_empty() {
            return Err(ProbeError::NoChildren(pid));
        }
        Ok(found)
    }

    fn rss(&self, pid: u32) -> Result<u64, ProbeError> {
        self.system
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .ok_or(ProbeError::ProcessGone(pid))
    }
}
