use std::sync::Mutex;

/// Source of proxy addresses (`host:port`) for provider sessions.
pub trait ProxyPool {
    /// Never runs dry: implementations cycle over their addresses.
    fn next(&self) -> String;
}

/// Fixed list of addresses handed out round-robin.
#[derive(Debug)]
pub struct CyclicProxyPool {
    addresses: Vec<String>,
    cursor: Mutex<usize>,
}

impl CyclicProxyPool {
    /// Returns `None` for an empty list, which means "no proxying".
    pub fn new(addresses: Vec<String>) -> Option<Self> {
        if addresses.is_empty() {
            return None;
        }
        Some(Self {
            addresses,
            cursor: Mutex::new(0),
        })
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }
}

impl ProxyPool for CyclicProxyPool {
    fn next(&self) -> String {
        let mut cursor = match self.cursor.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let address = self.addresses[*cursor].clone();
        *cursor = (*cursor + 1) % self.addresses.len();
        address
    }
}

#[cfg(test)]
pub mod testing {
    use super::ProxyPool;
    use std::cell::Cell;

    /// Hands out the same address and counts how often it was asked.
    pub struct CountingPool {
        pub address: String,
        pub calls: Cell<usize>,
    }

    impl CountingPool {
        pub fn new(address: &str) -> Self {
            Self {
                address: address.to_string(),
                calls: Cell::new(0),
            }
        }
    }

    impl ProxyPool for CountingPool {
        fn next(&self) -> String {
            self.calls.set(self.calls.get() + 1);
            self.address.clone()
        }
    }
}
