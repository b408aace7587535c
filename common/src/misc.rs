// Widens the low `bits` bits of `val` to a full word, replicating the field's
// sign bit into everything above it.
pub fn sign_extend(val: u16, bits: u32) -> u16 {
    debug_assert!(bits > 0 && bits < u16::BITS);
    let field = val & field_mask(bits);
    if (field >> (bits - 1)) & 0x1 != 0 {
        field | (u16::MAX << bits)
    } else {
        field
    }
}

pub fn field_mask(bits: u32) -> u16 {
    (1u16 << bits) - 1
}

pub fn swap16(val: u16) -> u16 {
    val.rotate_left(u8::BITS)
}

// Image files store words big-endian. `raw` is a word as it was laid out in
// the file, reinterpreted in host order.
pub fn from_big_endian(raw: u16) -> u16 {
    if cfg!(target_endian = "little") {
        swap16(raw)
    } else {
        raw
    }
}
