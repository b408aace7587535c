use super::asm::*;

type Decoder = fn(u16) -> Option<Ins>;

const DECODERS: &[Decoder] = &[
    OperateIns::decode,
    NotIns::decode,
    BranchIns::decode,
    JmpIns::decode,
    JsrIns::decode,
    PcRelIns::decode,
    BaseOffsetIns::decode,
    TrapIns::decode,
];

// None for RTI and the reserved opcode, neither of which has a handler.
pub fn decode(input: u16) -> Option<Ins> {
    DECODERS.iter().find_map(|decoder| decoder(input))
}
