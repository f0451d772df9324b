// memory.rs — Raw access to host memory, and the typed view built on top of it.
//
// This is the only module that dereferences host addresses. Everything above
// it goes through `TypedView`, which resolves a field name against a
// `StructLayout` and reads or writes exactly that field's bytes.
//
// Reads of memory that is not committed/readable return zero (null for
// pointers) instead of faulting; writes to memory that is not writable are
// dropped. On Windows this is checked with VirtualQuery; elsewhere only the
// null page is rejected.

use crate::layout::{FieldDesc, FieldKind, LayoutSet, StructLayout, POINTER_WIDTH};
use std::fmt;

// ============================================================
// Address
// ============================================================

/// A location in host memory. Identity only; the host owns what it points at.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(transparent)]
pub struct Address(usize);

impl Address {
    pub const NULL: Address = Address(0);

    pub const fn new(raw: usize) -> Self {
        Address(raw)
    }

    pub const fn get(self) -> usize {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// `None` for null, so a walk can use `?`/`while let`.
    pub fn non_null(self) -> Option<Address> {
        if self.is_null() { None } else { Some(self) }
    }

    fn offset(self, bytes: usize) -> usize {
        self.0.wrapping_add(bytes)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:X}", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl<T> From<*const T> for Address {
    fn from(p: *const T) -> Self {
        Address(p as usize)
    }
}

impl<T> From<*mut T> for Address {
    fn from(p: *mut T) -> Self {
        Address(p as usize)
    }
}

// ============================================================
// Typed view
// ============================================================

/// One modeled struct projected onto one address.
///
/// Views are built fresh inside a host callback and dropped before it
/// returns; the host may free or reuse the memory between callbacks.
#[derive(Clone, Copy)]
pub struct TypedView {
    addr: Address,
    layout: &'static StructLayout,
    set: &'static LayoutSet,
}

impl TypedView {
    /// View `addr` as the struct `name` of `set`. `None` if the address is
    /// null or the set does not model that struct.
    ///
    /// # Safety
    /// `addr` must point at a live host object of type `name` for as long as
    /// the view (and anything derived from it) is used.
    pub unsafe fn new(set: &'static LayoutSet, name: &str, addr: Address) -> Option<Self> {
        let layout = set.get(name)?;
        addr.non_null().map(|addr| Self { addr, layout, set })
    }

    pub fn address(&self) -> Address {
        self.addr
    }

    pub fn layout(&self) -> &'static StructLayout {
        self.layout
    }

    pub fn layout_set(&self) -> &'static LayoutSet {
        self.set
    }

    fn field(&self, name: &str, kind: fn(&FieldKind) -> bool) -> Option<&'static FieldDesc> {
        let layout: &'static StructLayout = self.layout;
        let f = layout.field(name).filter(|f| kind(&f.kind));
        debug_assert!(f.is_some(), "{}.{} not modeled as expected", layout.name, name);
        f
    }

    /// Read a pointer field. Null if the field is not a modeled pointer.
    pub fn ptr(&self, name: &str) -> Address {
        match self.field(name, |k| *k == FieldKind::Pointer) {
            // SAFETY: the field lies inside the live object (validated layout).
            Some(f) => Address(unsafe { read_usize(self.addr.offset(f.offset)) }),
            None => Address::NULL,
        }
    }

    /// Overwrite a pointer field. The only write the core ever performs.
    pub fn set_ptr(&self, name: &str, value: Address) {
        if let Some(f) = self.field(name, |k| *k == FieldKind::Pointer) {
            // SAFETY: as for `ptr`; pointer fields are exactly POINTER_WIDTH.
            unsafe { write_usize(self.addr.offset(f.offset), value.0) }
        }
    }

    /// Read a signed integer field of width 1, 2, 4 or 8.
    pub fn int(&self, name: &str) -> i64 {
        match self.field(name, |k| *k == FieldKind::Integer) {
            Some(f) => unsafe { read_int(self.addr.offset(f.offset), f.width) },
            None => 0,
        }
    }

    /// Read a `char[N]` field up to its first NUL.
    pub fn chars(&self, name: &str) -> String {
        match self.field(name, |k| *k == FieldKind::CharArray) {
            Some(f) => unsafe { read_cstr(self.addr.offset(f.offset), f.width) },
            None => String::new(),
        }
    }

    /// View an inline struct field (e.g. a `ListBase` inside a window).
    pub fn embedded(&self, name: &str) -> Option<TypedView> {
        let f = self.field(name, |k| matches!(k, FieldKind::Embedded(_)))?;
        let FieldKind::Embedded(ty) = f.kind else { return None };
        // SAFETY: an embedded struct lives as long as its parent.
        unsafe { TypedView::new(self.set, ty, Address(self.addr.offset(f.offset))) }
    }

    /// Re-view the same address as another struct sharing its prefix, such as
    /// an operator handler seen through its base handler.
    pub fn cast(&self, name: &str) -> Option<TypedView> {
        // SAFETY: the caller of `new` vouched for the object; the kind check
        // that justifies the cast is done by the caller.
        unsafe { TypedView::new(self.set, name, self.addr) }
    }
}

impl fmt::Debug for TypedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{:?}", self.layout.name, self.addr)
    }
}

// ============================================================
// Low-level memory access
// ============================================================

#[cfg(windows)]
const READABLE: u32 = winapi::um::winnt::PAGE_READONLY
    | winapi::um::winnt::PAGE_READWRITE
    | winapi::um::winnt::PAGE_WRITECOPY
    | winapi::um::winnt::PAGE_EXECUTE_READ
    | winapi::um::winnt::PAGE_EXECUTE_READWRITE
    | winapi::um::winnt::PAGE_EXECUTE_WRITECOPY;

#[cfg(windows)]
const WRITABLE: u32 = winapi::um::winnt::PAGE_READWRITE
    | winapi::um::winnt::PAGE_WRITECOPY
    | winapi::um::winnt::PAGE_EXECUTE_READWRITE
    | winapi::um::winnt::PAGE_EXECUTE_WRITECOPY;

/// Check if a memory range is committed with one of the `mask` protections.
#[cfg(windows)]
unsafe fn has_protection(addr: usize, len: usize, mask: u32) -> bool {
    use winapi::um::memoryapi::VirtualQuery;
    use winapi::um::winnt::{MEMORY_BASIC_INFORMATION, MEM_COMMIT, PAGE_GUARD};

    if addr == 0 || len == 0 { return false; }
    let mut mbi: MEMORY_BASIC_INFORMATION = std::mem::zeroed();
    let ret = VirtualQuery(addr as *const _, &mut mbi,
        std::mem::size_of::<MEMORY_BASIC_INFORMATION>());
    if ret == 0 { return false; }
    if mbi.State != MEM_COMMIT { return false; }
    if mbi.Protect & PAGE_GUARD != 0 { return false; }
    if mbi.Protect & mask == 0 { return false; }
    addr.saturating_add(len) <= mbi.BaseAddress as usize + mbi.RegionSize
}

#[cfg(windows)]
unsafe fn is_readable(addr: usize, len: usize) -> bool {
    has_protection(addr, len, READABLE)
}

/// Read-only and execute-read pages pass `is_readable` but fault on write.
#[cfg(windows)]
unsafe fn is_writable(addr: usize, len: usize) -> bool {
    has_protection(addr, len, WRITABLE)
}

/// Outside Windows there is no cheap query; only reject the null page.
#[cfg(not(windows))]
unsafe fn is_readable(addr: usize, len: usize) -> bool {
    addr >= 0x1000 && len != 0 && addr.checked_add(len).is_some()
}

#[cfg(not(windows))]
unsafe fn is_writable(addr: usize, len: usize) -> bool {
    is_readable(addr, len)
}

#[inline]
unsafe fn read_usize(addr: usize) -> usize {
    if !is_readable(addr, POINTER_WIDTH) { return 0; }
    std::ptr::read_unaligned(addr as *const usize)
}

#[inline]
unsafe fn write_usize(addr: usize, value: usize) {
    if !is_writable(addr, POINTER_WIDTH) { return; }
    std::ptr::write_unaligned(addr as *mut usize, value);
}

/// Read a signed integer of `width` bytes (0 for unsupported widths).
#[inline]
unsafe fn read_int(addr: usize, width: usize) -> i64 {
    if !is_readable(addr, width) { return 0; }
    match width {
        1 => std::ptr::read(addr as *const i8) as i64,
        2 => std::ptr::read_unaligned(addr as *const i16) as i64,
        4 => std::ptr::read_unaligned(addr as *const i32) as i64,
        8 => std::ptr::read_unaligned(addr as *const i64),
        _ => 0,
    }
}

/// Read a NUL-terminated string of at most `max_len` bytes.
unsafe fn read_cstr(addr: usize, max_len: usize) -> String {
    if !is_readable(addr, max_len) { return String::new(); }
    let bytes = std::slice::from_raw_parts(addr as *const u8, max_len);
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(max_len);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
