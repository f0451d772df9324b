// sim.rs — Synthetic host memory for tests.
//
// Allocates zeroed, 8-byte aligned blocks sized from a layout set so the core
// can be exercised against the same byte layout it would see in the host.

use crate::layout::{LayoutSet, FIELD_FIRST, FIELD_LAST, FIELD_MODAL_HANDLERS, FIELD_NEXT, FIELD_PREV, OPERATOR, WINDOW};
use crate::layout::HandlerKindSource;
use crate::memory::{Address, TypedView};

pub(crate) struct HostArena {
    set: &'static LayoutSet,
    blocks: Vec<(*mut u64, usize)>,
}

impl HostArena {
    pub(crate) fn new(set: &'static LayoutSet) -> Self {
        Self { set, blocks: Vec::new() }
    }

    pub(crate) fn alloc(&mut self, name: &str) -> Address {
        let size = self.set.get(name).unwrap_or_else(|| panic!("unmodeled {name}")).size;
        let words = size.div_ceil(8);
        let block: Box<[u64]> = vec![0u64; words].into_boxed_slice();
        let p = Box::into_raw(block) as *mut u64;
        self.blocks.push((p, words));
        Address::new(p as usize)
    }

    pub(crate) fn view(&self, addr: Address, name: &str) -> TypedView {
        unsafe { TypedView::new(self.set, name, addr) }.expect("live block")
    }

    fn field_addr(&self, addr: Address, strukt: &str, field: &str) -> (*mut u8, usize) {
        let f = self.set.get(strukt).and_then(|s| s.field(field)).expect("modeled field");
        ((addr.get() + f.offset) as *mut u8, f.width)
    }

    pub(crate) fn set_ptr(&self, addr: Address, strukt: &str, field: &str, value: Address) {
        self.view(addr, strukt).set_ptr(field, value);
    }

    pub(crate) fn set_int(&self, addr: Address, strukt: &str, field: &str, value: i64) {
        let (p, width) = self.field_addr(addr, strukt, field);
        let bytes = value.to_ne_bytes();
        let src = if cfg!(target_endian = "little") { &bytes[..width] } else { &bytes[8 - width..] };
        unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), p, width) };
    }

    pub(crate) fn set_chars(&self, addr: Address, strukt: &str, field: &str, s: &str) {
        let (p, width) = self.field_addr(addr, strukt, field);
        let n = s.len().min(width);
        unsafe {
            std::ptr::write_bytes(p, 0, width);
            std::ptr::copy_nonoverlapping(s.as_ptr(), p, n);
        }
    }

    /// Copy of every block, for byte-for-byte comparisons.
    pub(crate) fn snapshot(&self) -> Vec<Vec<u8>> {
        self.blocks
            .iter()
            .map(|&(p, words)| unsafe { std::slice::from_raw_parts(p as *const u8, words * 8) }.to_vec())
            .collect()
    }
}

impl Drop for HostArena {
    fn drop(&mut self) {
        for &(p, words) in &self.blocks {
            unsafe { drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(p, words))) };
        }
    }
}

// ============================================================
// Window + modal handler fixtures
// ============================================================

/// What to hang off a synthetic window's modal handler list.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Fake {
    Ui,
    Keymap,
    Dropbox,
    /// Only representable where the kind is a type field.
    Gizmo,
    /// Operator handler whose operator has this C idname.
    Op(&'static str),
    /// Operator handler with no operator attached.
    OpNull,
}

/// A window whose modal handler list holds one handler per `fakes` entry.
pub(crate) fn window_with(host: &mut HostArena, fakes: &[Fake]) -> (Address, Vec<Address>) {
    let set = host.set;
    let schema = set.handler;
    let win = host.alloc(WINDOW);
    let mut handlers = Vec::new();

    for fake in fakes {
        let is_op = matches!(fake, Fake::Op(_) | Fake::OpNull);
        let h = host.alloc(if is_op { schema.op_struct } else { schema.base });

        match schema.kind {
            HandlerKindSource::TypeField { field, enum_name } => {
                let item = match fake {
                    Fake::Ui => "WM_HANDLER_TYPE_UI",
                    Fake::Keymap => "WM_HANDLER_TYPE_KEYMAP",
                    Fake::Dropbox => "WM_HANDLER_TYPE_DROPBOX",
                    Fake::Gizmo => "WM_HANDLER_TYPE_GIZMO",
                    Fake::Op(_) | Fake::OpNull => "WM_HANDLER_TYPE_OP",
                };
                let value = set.enum_layout(enum_name).and_then(|e| e.value(item)).expect("enum item");
                host.set_int(h, schema.base, field, value);
            }
            HandlerKindSource::PointerPresence { ui, dropbox, keymap, .. } => match fake {
                // Never dereferenced; only tested for null.
                Fake::Ui => host.set_ptr(h, schema.base, ui, Address::new(0xC0FFEE0)),
                Fake::Keymap => host.set_ptr(h, schema.base, keymap, Address::new(0xC0FFEE0)),
                Fake::Dropbox => host.set_ptr(h, schema.base, dropbox, Address::new(0xC0FFEE0)),
                Fake::Gizmo => panic!("{} has no gizmo handlers", set.name),
                Fake::Op(_) | Fake::OpNull => {}
            },
        }

        if let Fake::Op(idname) = fake {
            let op = host.alloc(OPERATOR);
            host.set_chars(op, OPERATOR, "idname", idname);
            host.set_ptr(h, schema.op_struct, schema.op_field, op);
        }
        handlers.push(h);
    }

    for (i, &h) in handlers.iter().enumerate() {
        let prev = if i == 0 { Address::NULL } else { handlers[i - 1] };
        let next = handlers.get(i + 1).copied().unwrap_or(Address::NULL);
        host.set_ptr(h, schema.base, FIELD_PREV, prev);
        host.set_ptr(h, schema.base, FIELD_NEXT, next);
    }
    let list = host.view(win, WINDOW).embedded(FIELD_MODAL_HANDLERS).expect("modal handler list");
    list.set_ptr(FIELD_FIRST, handlers.first().copied().unwrap_or(Address::NULL));
    list.set_ptr(FIELD_LAST, handlers.last().copied().unwrap_or(Address::NULL));

    (win, handlers)
}

/// Walk the window's modal handlers both ways, asserting the two walks agree
/// and the endpoints are right. Returns the forward order.
pub(crate) fn walk_checked(host: &HostArena, win: Address) -> Vec<Address> {
    let base = host.set.handler.base;
    let list = host.view(win, WINDOW).embedded(FIELD_MODAL_HANDLERS).expect("modal handler list");

    let mut forward = Vec::new();
    let mut cur = list.ptr(FIELD_FIRST);
    while !cur.is_null() {
        assert!(forward.len() < 1024, "cycle in forward walk");
        forward.push(cur);
        cur = host.view(cur, base).ptr(FIELD_NEXT);
    }

    let mut backward = Vec::new();
    let mut cur = list.ptr(FIELD_LAST);
    while !cur.is_null() {
        assert!(backward.len() < 1024, "cycle in backward walk");
        backward.push(cur);
        cur = host.view(cur, base).ptr(FIELD_PREV);
    }
    backward.reverse();

    assert_eq!(forward, backward, "forward and backward walks disagree");
    assert_eq!(list.ptr(FIELD_FIRST), forward.first().copied().unwrap_or(Address::NULL));
    assert_eq!(list.ptr(FIELD_LAST), forward.last().copied().unwrap_or(Address::NULL));
    forward
}
