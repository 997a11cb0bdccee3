use tracing::{debug, warn};

use super::{ItemKind, ItemRef, Registry};
use crate::test::{Extra, HookFn, Suite, Test, TestFn};

/// A unit of registration: a function declaring items on a [`Chain`].
pub type Unit = fn(&mut Chain<'_>);

/// A unit made importable by name from other units.
///
/// Submitted through [`export!`](crate::export).
pub struct ExportedUnit {
    pub name: &'static str,
    pub unit: Unit,
}

impl ExportedUnit {
    pub const fn new(name: &'static str, unit: Unit) -> Self {
        Self { name, unit }
    }
}

inventory::collect!(ExportedUnit);

/// Builder appending items to the chain of the unit being registered.
///
/// Each declaration links the new item to the previously declared one, so
/// declaration order is the execution order.
pub struct Chain<'r> {
    registry: &'r mut Registry,
    tail: Option<ItemRef>,
}

impl<'r> Chain<'r> {
    pub(crate) fn new(registry: &'r mut Registry) -> Self {
        Self {
            registry,
            tail: None,
        }
    }

    /// Last item declared so far.
    pub fn tail(&self) -> Option<ItemRef> {
        self.tail
    }

    fn push(&mut self, kind: ItemKind) -> &mut Self {
        self.tail = Some(self.registry.push(self.tail, kind));
        self
    }

    /// Start a new suite; the following tests belong to it.
    pub fn suite(&mut self, name: &'static str) -> &mut Self {
        self.push(ItemKind::Suite(Suite::new(name)))
    }

    /// Set-up hook of the enclosing suite.
    pub fn setup(&mut self, fun: HookFn) -> &mut Self {
        self.push(ItemKind::Setup(fun))
    }

    /// Tear-down hook of the enclosing suite.
    pub fn teardown(&mut self, fun: HookFn) -> &mut Self {
        self.push(ItemKind::Teardown(fun))
    }

    pub fn test(&mut self, name: &'static str, fun: TestFn) -> &mut Self {
        self.test_with(name, fun, [])
    }

    pub fn test_with(
        &mut self,
        name: &'static str,
        fun: TestFn,
        extras: impl IntoIterator<Item = Extra>,
    ) -> &mut Self {
        self.push(ItemKind::Test(Test {
            name,
            fun,
            extras: extras.into_iter().collect(),
        }))
    }

    /// Splice the items of the unit exported under `name` at this point.
    ///
    /// An unknown name leaves an empty import, which registers nothing.
    pub fn import(&mut self, name: &str) -> &mut Self {
        let exported = inventory::iter::<ExportedUnit>
            .into_iter()
            .find(|exported| exported.name == name);

        match exported {
            Some(exported) => self.import_unit(exported.name, exported.unit),
            None => {
                warn!(unit = name, "no unit exported under this name, import ignored");
                self.push(ItemKind::Nested { last: None })
            }
        }
    }

    /// Splice the items of `unit` at this point, under `name`.
    pub fn import_unit(&mut self, name: &'static str, unit: Unit) -> &mut Self {
        if self.registry.importing.contains(&name) {
            warn!(unit = name, "unit imports itself, import ignored");
            return self.push(ItemKind::Nested { last: None });
        }

        debug!(unit = name, "importing unit");
        self.registry.importing.push(name);
        let last = {
            let mut nested = Chain::new(&mut *self.registry);
            unit(&mut nested);
            nested.tail
        };
        self.registry.importing.pop();

        self.push(ItemKind::Nested { last })
    }
}

#[cfg(test)]
mod tests {
    use crate::export;
    use crate::registry::{ItemKind, ItemList, SuiteRef};
    use crate::test::Extra;

    fn noop() {}

    fn helpers(chain: &mut super::Chain) {
        chain.suite("helpers").test("helper", noop);
    }

    fn recursive(chain: &mut super::Chain) {
        chain.test("before", noop).import("chain-recursive").test("after", noop);
    }

    export!("chain-helpers", helpers);
    export!("chain-recursive", recursive);

    fn names(list: &ItemList) -> Vec<&'static str> {
        list.iter()
            .filter_map(|it| list[it].as_test().map(|t| t.name))
            .collect()
    }

    #[test]
    fn declaration_order_is_kept() {
        let list = ItemList::new(|chain| {
            chain
                .test("one", noop)
                .suite("S")
                .test("two", noop)
                .test_with("three", noop, [Extra::Timeout(2)]);
        });
        assert_eq!(names(&list), vec!["one", "two", "three"]);
        assert_eq!(list.count_tests(), 3);
    }

    #[test]
    fn import_splices_exported_unit() {
        let list = ItemList::new(|chain| {
            chain.test("first", noop).import("chain-helpers").test("last", noop);
        });
        assert_eq!(names(&list), vec!["first", "helper", "last"]);

        let last = list
            .iter()
            .find(|&it| list[it].as_test().is_some_and(|t| t.name == "last"))
            .unwrap();
        let suite = list.registry().parent_suite(last);
        assert_eq!(list.registry().suite(suite).name, "helpers");
    }

    #[test]
    fn unknown_import_registers_nothing() {
        let list = ItemList::new(|chain| {
            chain.import("no-such-unit").test("only", noop);
        });
        assert_eq!(names(&list), vec!["only"]);
        let only = list.find_by_id(1).unwrap();
        assert_eq!(list.registry().parent_suite(only), SuiteRef::Default);
    }

    #[test]
    fn self_import_is_cut() {
        let list = ItemList::new(|chain| {
            chain.import("chain-recursive");
        });
        assert_eq!(names(&list), vec!["before", "after"]);
    }

    #[test]
    fn hooks_are_registered_as_items() {
        let list = ItemList::new(|chain| {
            chain.suite("S").setup(noop).teardown(noop).test("t", noop);
        });
        let kinds: Vec<_> = list
            .iter()
            .map(|it| match list[it].kind {
                ItemKind::Suite(_) => "suite",
                ItemKind::Setup(_) => "setup",
                ItemKind::Teardown(_) => "teardown",
                ItemKind::Test(_) => "test",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["suite", "setup", "teardown", "test"]);
    }

    #[test]
    fn empty_unit_has_no_head() {
        let list = ItemList::new(|_| {});
        assert!(list.head().is_none());
        assert_eq!(list.count_tests(), 0);
    }
}
