// listbase.rs — find / remove / insert-after on a host-owned intrusive list.
//
// The list head is a `ListBase {first, last}` living inside some host struct,
// and every element starts with `{next, prev}`, so any element can be viewed
// as a generic `Link`. The host walks these lists right after we return, so
// after every mutation both walks must be intact:
//
//   first -> ... -> last -> null      (via next)
//   last  -> ... -> first -> null     (via prev)
//
// Nodes are never allocated or freed here; they stay owned by the host.

use crate::layout::{LayoutSet, FIELD_FIRST, FIELD_LAST, FIELD_NEXT, FIELD_PREV, LINK, LIST_BASE};
use crate::memory::{Address, TypedView};

pub struct IntrusiveList {
    base: TypedView,
    set: &'static LayoutSet,
}

impl IntrusiveList {
    /// Wrap a `ListBase` view. `None` if the view is of another struct.
    pub fn new(base: TypedView) -> Option<Self> {
        if base.layout().name != LIST_BASE {
            return None;
        }
        let set = base.layout_set();
        set.get(LINK)?;
        Some(Self { base, set })
    }

    pub fn first(&self) -> Address {
        self.base.ptr(FIELD_FIRST)
    }

    pub fn last(&self) -> Address {
        self.base.ptr(FIELD_LAST)
    }

    pub fn is_empty(&self) -> bool {
        self.first().is_null()
    }

    fn link(&self, node: Address) -> Option<TypedView> {
        // SAFETY: nodes handed to or reached from a live list are live for the
        // current callback (contract of `remove`/`insert_after` and the walk).
        unsafe { TypedView::new(self.set, LINK, node) }
    }

    fn next_of(&self, node: Address) -> Address {
        self.link(node).map_or(Address::NULL, |l| l.ptr(FIELD_NEXT))
    }

    /// Forward walk over element addresses, starting from `first` each time.
    pub fn iter(&self) -> Links<'_> {
        Links { list: self, cur: self.first() }
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// The `n`th element, or `None` if the list ends first.
    pub fn find(&self, n: usize) -> Option<Address> {
        let mut link = self.first();
        let mut n = n;
        while !link.is_null() && n != 0 {
            n -= 1;
            link = self.next_of(link);
        }
        link.non_null()
    }

    /// Unlink `node`. Its own `next`/`prev` are left as they were.
    ///
    /// # Safety
    /// `node` must be a live element of this list.
    pub unsafe fn remove(&self, node: Address) {
        let Some(link) = self.link(node) else { return };
        let next = link.ptr(FIELD_NEXT);
        let prev = link.ptr(FIELD_PREV);

        if let Some(n) = self.link(next) {
            n.set_ptr(FIELD_PREV, prev);
        }
        if let Some(p) = self.link(prev) {
            p.set_ptr(FIELD_NEXT, next);
        }

        if self.last() == node {
            self.base.set_ptr(FIELD_LAST, prev);
        }
        if self.first() == node {
            self.base.set_ptr(FIELD_FIRST, next);
        }
    }

    /// Link `node` right after `prev`, or at the head when `prev` is `None`.
    ///
    /// # Safety
    /// `node` must be live and not currently linked into this list; `prev`,
    /// when given, must be a live element of this list.
    pub unsafe fn insert_after(&self, prev: Option<Address>, node: Address) {
        let Some(new) = self.link(node) else { return };

        if self.is_empty() {
            new.set_ptr(FIELD_NEXT, Address::NULL);
            new.set_ptr(FIELD_PREV, Address::NULL);
            self.base.set_ptr(FIELD_FIRST, node);
            self.base.set_ptr(FIELD_LAST, node);
            return;
        }

        let Some(prev_link) = prev.and_then(|p| self.link(p)) else {
            // New head.
            let first = self.first();
            new.set_ptr(FIELD_PREV, Address::NULL);
            new.set_ptr(FIELD_NEXT, first);
            if let Some(f) = self.link(first) {
                f.set_ptr(FIELD_PREV, node);
            }
            self.base.set_ptr(FIELD_FIRST, node);
            return;
        };

        if self.last() == prev_link.address() {
            self.base.set_ptr(FIELD_LAST, node);
        }

        let next = prev_link.ptr(FIELD_NEXT);
        new.set_ptr(FIELD_NEXT, next);
        new.set_ptr(FIELD_PREV, prev_link.address());
        prev_link.set_ptr(FIELD_NEXT, node);
        if let Some(n) = self.link(next) {
            n.set_ptr(FIELD_PREV, node);
        }
    }
}

pub struct Links<'a> {
    list: &'a IntrusiveList,
    cur: Address,
}

impl Iterator for Links<'_> {
    type Item = Address;

    fn next(&mut self) -> Option<Address> {
        let here = self.cur.non_null()?;
        self.cur = self.list.next_of(here);
        Some(here)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{v2_79, v3_4, FIELD_MODAL_HANDLERS, WINDOW};
    use crate::sim::{walk_checked, window_with, Fake, HostArena};
    use pretty_assertions::assert_eq;

    fn modal_list(host: &HostArena, win: Address) -> IntrusiveList {
        IntrusiveList::new(host.view(win, WINDOW).embedded(FIELD_MODAL_HANDLERS).unwrap()).unwrap()
    }

    #[test]
    fn find_stops_at_the_end() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, hs) = window_with(&mut host, &[Fake::Keymap, Fake::Keymap, Fake::Keymap]);
        let list = modal_list(&host, win);

        assert_eq!(list.find(0), Some(hs[0]));
        assert_eq!(list.find(2), Some(hs[2]));
        assert_eq!(list.find(3), None);
        assert_eq!(list.find(usize::MAX), None);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn find_on_empty_list() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, _) = window_with(&mut host, &[]);
        let list = modal_list(&host, win);
        assert!(list.is_empty());
        assert_eq!(list.find(0), None);
    }

    #[test]
    fn remove_head_middle_tail_and_only() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, hs) = window_with(&mut host, &[Fake::Keymap; 4]);
        let list = modal_list(&host, win);

        unsafe { list.remove(hs[0]) };
        assert_eq!(walk_checked(&host, win), vec![hs[1], hs[2], hs[3]]);
        unsafe { list.remove(hs[2]) };
        assert_eq!(walk_checked(&host, win), vec![hs[1], hs[3]]);
        unsafe { list.remove(hs[3]) };
        assert_eq!(walk_checked(&host, win), vec![hs[1]]);
        unsafe { list.remove(hs[1]) };
        assert_eq!(walk_checked(&host, win), Vec::<Address>::new());
    }

    #[test]
    fn remove_leaves_the_node_untouched() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, hs) = window_with(&mut host, &[Fake::Keymap; 3]);
        let list = modal_list(&host, win);

        unsafe { list.remove(hs[1]) };
        let link = host.view(hs[1], LINK);
        assert_eq!(link.ptr(FIELD_NEXT), hs[2]);
        assert_eq!(link.ptr(FIELD_PREV), hs[0]);
    }

    #[test]
    fn insert_into_empty_list_clears_stale_links() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, hs) = window_with(&mut host, &[Fake::Keymap; 2]);
        let list = modal_list(&host, win);

        unsafe {
            list.remove(hs[0]);
            list.remove(hs[1]);
            list.insert_after(None, hs[0]);
        }
        assert_eq!(walk_checked(&host, win), vec![hs[0]]);
    }

    #[test]
    fn insert_at_head_middle_and_tail() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let (win, hs) = window_with(&mut host, &[Fake::Keymap; 4]);
        let list = modal_list(&host, win);

        unsafe {
            list.remove(hs[3]);
            list.insert_after(None, hs[3]);
        }
        assert_eq!(walk_checked(&host, win), vec![hs[3], hs[0], hs[1], hs[2]]);

        unsafe {
            list.remove(hs[3]);
            list.insert_after(Some(hs[2]), hs[3]);
        }
        assert_eq!(walk_checked(&host, win), vec![hs[0], hs[1], hs[2], hs[3]]);

        unsafe {
            list.remove(hs[0]);
            list.insert_after(Some(hs[1]), hs[0]);
        }
        assert_eq!(walk_checked(&host, win), vec![hs[1], hs[0], hs[2], hs[3]]);
    }

    /// Every remove/insert pair keeps both walks consistent, whatever the
    /// positions involved.
    #[test]
    fn integrity_holds_across_every_splice() {
        for set in [&v3_4::LAYOUT, &v2_79::LAYOUT] {
            let mut host = HostArena::new(set);
            let (win, _) = window_with(&mut host, &[Fake::Keymap; 5]);
            let list = modal_list(&host, win);

            for from in 0..5 {
                for to in 0..5 {
                    let before = walk_checked(&host, win);
                    let node = list.find(from).unwrap();
                    unsafe { list.remove(node) };
                    let after_remove = walk_checked(&host, win);
                    let mut expected: Vec<_> = before.iter().copied().filter(|&a| a != node).collect();
                    assert_eq!(after_remove, expected);

                    let prev = if to == 0 { None } else { list.find(to - 1) };
                    unsafe { list.insert_after(prev, node) };
                    expected.insert(to.min(expected.len()), node);
                    assert_eq!(walk_checked(&host, win), expected);
                }
            }
        }
    }

    #[test]
    fn rejects_non_listbase_view() {
        let mut host = HostArena::new(&v3_4::LAYOUT);
        let win = host.alloc(WINDOW);
        assert!(IntrusiveList::new(host.view(win, WINDOW)).is_none());
    }
}
