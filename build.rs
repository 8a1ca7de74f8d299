use std::ptr;

#[derive(Clone)]
struct Probe(#[allow(dead_code)] u64);

trait Measure {
    fn measure(&self) -> usize;
}

impl Measure for Probe {
    fn measure(&self) -> usize {
        8
    }
}

#[repr(C)]
struct FatRepr {
    data: *const u8,
    meta: usize,
}

fn layout_broken(what: &str) -> ! {
    panic!(
        "polyvalue stores the data address in the first word of a {what} pointer \
         and swaps it in place; this target lays {what} pointers out differently"
    );
}

/// `sptr::with_metadata_of_mut` overwrites the first word of a fat pointer
/// with a new address. Make sure that word is the address for the fat
/// pointer kinds a `PolyValue` is used with.
fn check_fat_pointers() {
    let boxed = Box::new(Probe(1));
    let data = Box::into_raw(boxed);

    let object: *const dyn Measure = data;
    let repr: FatRepr = unsafe { ptr::read(ptr::addr_of!(object).cast::<FatRepr>()) };
    if repr.data != data.cast::<u8>().cast_const() {
        layout_broken("trait object");
    }
    let boxed = unsafe { Box::from_raw(data) };
    assert_eq!(boxed.measure(), 8);

    let words = [1u16, 2, 3];
    let slice: *const [u16] = &words;
    let repr: FatRepr = unsafe { ptr::read(ptr::addr_of!(slice).cast::<FatRepr>()) };
    if repr.data != words.as_ptr().cast::<u8>() || repr.meta != words.len() {
        layout_broken("slice");
    }
}

fn main() {
    // Host layout may differ from the target's; this only catches the
    // common case of a toolchain changing fat pointer layout.
    check_fat_pointers();
    println!("cargo:rerun-if-changed=build.rs");
}
