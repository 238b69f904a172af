// Owned-address lookup

use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, RwLock};

use crate::sync::types::Address;

/// The set of addresses this wallet holds spending keys for.
///
/// The engine only ever asks "is this ours"; keys are generated and inserted
/// by whoever owns the seed.
pub trait AddressBook {
    fn contains(&self, address: &Address) -> bool;
}

impl AddressBook for HashSet<Address> {
    fn contains(&self, address: &Address) -> bool {
        HashSet::contains(self, address)
    }
}

impl AddressBook for BTreeSet<Address> {
    fn contains(&self, address: &Address) -> bool {
        BTreeSet::contains(self, address)
    }
}

impl<T: AddressBook + ?Sized> AddressBook for Arc<T> {
    fn contains(&self, address: &Address) -> bool {
        (**self).contains(address)
    }
}

/// Address set that can be grown while the wallet is running.
///
/// Cloning is cheap and every clone observes the same set.
#[derive(Debug, Clone, Default)]
pub struct SharedAddressBook {
    inner: Arc<RwLock<HashSet<Address>>>,
}

impl SharedAddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an address. Returns `false` if it was already known.
    pub fn insert(&self, address: Address) -> bool {
        log::debug!("[ADDRESSES] tracking {}", address);
        match self.inner.write() {
            Ok(mut set) => set.insert(address),
            Err(poisoned) => poisoned.into_inner().insert(address),
        }
    }

    /// Derives the address for `key` and registers it.
    pub fn insert_unlock_key(&self, key: &[u8]) -> Address {
        let address = Address::from_unlock_key(key);
        self.insert(address);
        address
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(set) => set.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Address> for SharedAddressBook {
    fn from_iter<I: IntoIterator<Item = Address>>(iter: I) -> Self {
        Self {
            inner: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}

impl AddressBook for SharedAddressBook {
    fn contains(&self, address: &Address) -> bool {
        match self.inner.read() {
            Ok(set) => set.contains(address),
            Err(poisoned) => poisoned.into_inner().contains(address),
        }
    }
}
