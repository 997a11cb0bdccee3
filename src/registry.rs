//! Registry of test items.
//!
//! Items live in an arena and are linked through [`ItemRef`] handles. Units
//! register their items as a reverse-linked chain (each item only knows its
//! predecessor); [`Registry::fix_list`] turns that chain into a forward-linked,
//! flattened and numbered list which the runner then walks.

use std::ops::{Index, IndexMut};

use tracing::debug;

use crate::test::{HookFn, Suite, Test};

mod chain;
pub use chain::{Chain, ExportedUnit, Unit};

/// Handle of an item inside a [`Registry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemRef(usize);

/// Kind-specific payload of an item.
#[derive(Debug, Clone)]
pub enum ItemKind {
    /// Tombstone, skipped by every traversal.
    Skip,
    /// Import of another unit, referencing the tail of its chain.
    Nested { last: Option<ItemRef> },
    Setup(HookFn),
    Teardown(HookFn),
    Suite(Suite),
    Test(Test),
}

#[derive(Debug, Clone)]
pub struct Item {
    /// Assigned by the fix-up pass, `None` for tombstones.
    pub id: Option<u32>,
    pub previous: Option<ItemRef>,
    pub next: Option<ItemRef>,
    pub kind: ItemKind,
}

impl Item {
    pub fn is_tombstone(&self) -> bool {
        matches!(self.kind, ItemKind::Skip)
    }

    pub fn as_test(&self) -> Option<&Test> {
        match &self.kind {
            ItemKind::Test(test) => Some(test),
            _ => None,
        }
    }

    pub fn as_suite(&self) -> Option<&Suite> {
        match &self.kind {
            ItemKind::Suite(suite) => Some(suite),
            _ => None,
        }
    }
}

/// The suite a test is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuiteRef {
    /// Implicit suite for tests declared before any suite.
    Default,
    Item(ItemRef),
}

/// Arena owning every registered item.
#[derive(Debug)]
pub struct Registry {
    items: Vec<Item>,
    default_suite: Suite,
    /// Names of the units currently being imported, to cut import cycles.
    importing: Vec<&'static str>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<ItemRef> for Registry {
    type Output = Item;

    fn index(&self, index: ItemRef) -> &Self::Output {
        &self.items[index.0]
    }
}

impl IndexMut<ItemRef> for Registry {
    fn index_mut(&mut self, index: ItemRef) -> &mut Self::Output {
        &mut self.items[index.0]
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            default_suite: Suite::new("Default"),
            importing: Vec::new(),
        }
    }

    /// Allocate a new item linked after `previous`.
    pub fn push(&mut self, previous: Option<ItemRef>, kind: ItemKind) -> ItemRef {
        let handle = ItemRef(self.items.len());
        self.items.push(Item {
            id: None,
            previous,
            next: None,
            kind,
        });
        handle
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Run a unit against this registry and return the tail of its chain.
    pub fn build(&mut self, unit: Unit) -> Option<ItemRef> {
        let mut chain = Chain::new(self);
        unit(&mut chain);
        chain.tail()
    }

    /// Invert the chain ending at `last`, splice nested imports and number
    /// the items. Returns the head of the list.
    ///
    /// Running it again on an already fixed list yields the same list.
    pub fn fix_list(&mut self, last: ItemRef) -> ItemRef {
        self[last].next = None;
        self.fix_nested(last);

        let mut next = last;
        let mut cursor = self[last].previous;
        while let Some(it) = cursor {
            self[it].next = Some(next);
            self.fix_nested(it);
            next = it;
            cursor = self[it].previous;
        }

        self.set_ids(next);

        next
    }

    /// Splice the sublist of a nested item right after it and tombstone it.
    fn fix_nested(&mut self, nested: ItemRef) {
        let ItemKind::Nested { last } = &self[nested].kind else {
            return;
        };
        let last = *last;
        self[nested].kind = ItemKind::Skip;

        let Some(last) = last else {
            return;
        };

        let first = self.fix_list(last);
        let after = self[nested].next;
        self[last].next = after;
        if let Some(after) = after {
            self[after].previous = Some(last);
        }
        self[nested].next = Some(first);
        self[first].previous = Some(nested);
    }

    fn set_ids(&mut self, first: ItemRef) {
        let mut id = 1;
        let mut cursor = self.real(Some(first));
        while let Some(it) = cursor {
            self[it].id = Some(id);
            id += 1;
            cursor = self.real_next(it);
        }
        debug!(items = id - 1, "numbered registered items");
    }

    /// The item itself, or the first non-tombstone one after it.
    pub fn real(&self, item: Option<ItemRef>) -> Option<ItemRef> {
        let item = item?;
        if self[item].is_tombstone() {
            self.real_next(item)
        } else {
            Some(item)
        }
    }

    /// The next non-tombstone item.
    pub fn real_next(&self, item: ItemRef) -> Option<ItemRef> {
        let mut cursor = self[item].next;
        while let Some(it) = cursor {
            if !self[it].is_tombstone() {
                return Some(it);
            }
            cursor = self[it].next;
        }
        None
    }

    /// Iterate over the non-tombstone items starting at `head`.
    pub fn iter(&self, head: Option<ItemRef>) -> Iter<'_> {
        Iter {
            registry: self,
            cursor: self.real(head),
        }
    }

    pub fn find_by_id(&self, head: Option<ItemRef>, id: u32) -> Option<ItemRef> {
        self.iter(head).find(|&it| self[it].id == Some(id))
    }

    /// Nearest suite walking backward from `item`.
    pub fn parent_suite(&self, item: ItemRef) -> SuiteRef {
        let mut cursor = Some(item);
        while let Some(it) = cursor {
            if matches!(self[it].kind, ItemKind::Suite(_)) {
                return SuiteRef::Item(it);
            }
            cursor = self[it].previous;
        }
        SuiteRef::Default
    }

    pub fn suite(&self, suite: SuiteRef) -> &Suite {
        match suite {
            SuiteRef::Default => &self.default_suite,
            SuiteRef::Item(it) => match &self[it].kind {
                ItemKind::Suite(suite) => suite,
                _ => &self.default_suite,
            },
        }
    }

    pub fn suite_mut(&mut self, suite: SuiteRef) -> &mut Suite {
        match suite {
            SuiteRef::Item(it) if matches!(self[it].kind, ItemKind::Suite(_)) => {
                match &mut self.items[it.0].kind {
                    ItemKind::Suite(suite) => suite,
                    _ => unreachable!(),
                }
            }
            _ => &mut self.default_suite,
        }
    }

    /// Turn an item into a tombstone, dropping its id.
    pub fn tombstone(&mut self, item: ItemRef) {
        self[item].kind = ItemKind::Skip;
        self[item].id = None;
    }

    pub fn count_tests(&self, head: Option<ItemRef>) -> usize {
        self.iter(head)
            .filter(|&it| self[it].as_test().is_some())
            .count()
    }
}

/// Iterator over non-tombstone items, see [`Registry::iter`].
pub struct Iter<'a> {
    registry: &'a Registry,
    cursor: Option<ItemRef>,
}

impl Iterator for Iter<'_> {
    type Item = ItemRef;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        self.cursor = self.registry.real_next(current);
        Some(current)
    }
}

/// Fixed-up list of every item registered by a root unit.
#[derive(Debug)]
pub struct ItemList {
    registry: Registry,
    head: Option<ItemRef>,
}

impl ItemList {
    /// Register the items of `unit` (and everything it imports) and fix the list up.
    pub fn new(unit: Unit) -> Self {
        let mut registry = Registry::new();
        let head = registry.build(unit).map(|tail| registry.fix_list(tail));
        debug!(allocated = registry.len(), "registry ready");
        Self { registry, head }
    }

    pub fn head(&self) -> Option<ItemRef> {
        self.head
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn iter(&self) -> Iter<'_> {
        self.registry.iter(self.head)
    }

    pub fn find_by_id(&self, id: u32) -> Option<ItemRef> {
        self.registry.find_by_id(self.head, id)
    }

    pub fn count_tests(&self) -> usize {
        self.registry.count_tests(self.head)
    }
}

impl Index<ItemRef> for ItemList {
    type Output = Item;

    fn index(&self, index: ItemRef) -> &Self::Output {
        &self.registry[index]
    }
}
