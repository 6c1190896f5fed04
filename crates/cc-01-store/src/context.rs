//! # Execution Context
//!
//! The storage transaction and block header handed to every hook. The
//! caller owns the multistore; a `Context` only borrows it for the span of
//! one phase or one dispatch.

use shared_types::{BlockHeader, Event};

use crate::domain::{StoreError, StoreKey};
use crate::multistore::{KvStore, MultiStore};

pub struct Context<'a> {
    header: BlockHeader,
    store: &'a mut MultiStore,
    events: Vec<Event>,
}

impl<'a> Context<'a> {
    pub fn new(store: &'a mut MultiStore, header: BlockHeader) -> Self {
        Self {
            header,
            store,
            events: Vec::new(),
        }
    }

    pub fn header(&self) -> &BlockHeader {
        &self.header
    }

    pub fn block_height(&self) -> u64 {
        self.header.height
    }

    pub fn chain_id(&self) -> &str {
        &self.header.chain_id
    }

    /// Read access to the partition behind `key`.
    pub fn kv(&self, key: &StoreKey) -> Result<&KvStore, StoreError> {
        self.store.store(key)
    }

    /// Write access to the partition behind `key`.
    pub fn kv_mut(&mut self, key: &StoreKey) -> Result<&mut KvStore, StoreError> {
        self.store.store_mut(key)
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    /// Drain events emitted so far.
    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StoreKeyAllocator, StoreKind};

    #[test]
    fn test_writes_visible_after_context_dropped() {
        let mut alloc = StoreKeyAllocator::new();
        let key = alloc.new_store_key("bank", StoreKind::Persistent).unwrap();
        let mut ms = MultiStore::new();
        ms.mount(key.clone()).unwrap();

        {
            let mut ctx = Context::new(&mut ms, BlockHeader::default());
            ctx.kv_mut(&key).unwrap().set(b"supply".to_vec(), b"100".to_vec());
        }

        assert_eq!(ms.store(&key).unwrap().get(b"supply"), Some(&b"100"[..]));
    }

    #[test]
    fn test_take_events_drains() {
        let mut ms = MultiStore::new();
        let mut ctx = Context::new(&mut ms, BlockHeader::default());
        ctx.emit(Event::new("a"));
        ctx.emit(Event::new("b"));

        assert_eq!(ctx.take_events().len(), 2);
        assert!(ctx.take_events().is_empty());
    }
}
