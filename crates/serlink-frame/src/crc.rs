//! CRC-16/MCRF4XX, the checksum the controller applies to frame payloads.

/// Compute the CRC-16/MCRF4XX of `data`.
///
/// Register starts at `0xFFFF`; each byte is XORed into the low bits and
/// shifted out LSB-first against the reversed CCITT polynomial `0x8408`.
/// No final XOR. Pure function of its input.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ 0x8408;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
