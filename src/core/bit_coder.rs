use std::vec;

pub trait ByteWriter: Sized {
    fn write_u8(&mut self, value: u8);
    fn write_u16(&mut self, value: u16) {
        self.write_u8(value as u8);
        self.write_u8((value >> 8) as u8);
    }
    fn write_u32(&mut self, value: u32) {
        self.write_u16(value as u16);
        self.write_u16((value >> 16) as u16);
    }
    fn write_u64(&mut self, value: u64) {
        self.write_u32(value as u32);
        self.write_u32((value >> 32) as u32);
    }
    fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }
    fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }
    fn write_bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.write_u8(b);
        }
    }
}

impl ByteWriter for Vec<u8> {
    fn write_u8(&mut self, value: u8) {
        self.push(value);
    }

    fn write_u16(&mut self, value: u16) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u32(&mut self, value: u32) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_u64(&mut self, value: u64) {
        self.extend_from_slice(&value.to_le_bytes());
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.extend_from_slice(bytes);
    }
}


pub trait ByteReader {
    fn read_u8(&mut self) -> Result<u8, ReaderErr>;
    fn read_u16(&mut self) -> Result<u16, ReaderErr> {
        let out = [
            self.read_u8()?,
            self.read_u8()?
        ];
        Ok(u16::from_le_bytes(out))
    }
    fn read_u32(&mut self) -> Result<u32, ReaderErr> {
        let out = [
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?,
            self.read_u8()?
        ];
        Ok(u32::from_le_bytes(out))
    }
    fn read_u64(&mut self) -> Result<u64, ReaderErr> {
        let lo = self.read_u32()? as u64;
        let hi = self.read_u32()? as u64;
        Ok(lo | (hi << 32))
    }
    fn read_i64(&mut self) -> Result<i64, ReaderErr> {
        Ok(self.read_u64()? as i64)
    }
    fn read_f64(&mut self) -> Result<f64, ReaderErr> {
        Ok(f64::from_bits(self.read_u64()?))
    }
    /// Returns the number of bytes left, when the reader knows it.
    fn remaining(&self) -> Option<usize> {
        None
    }
}

impl ByteReader for vec::IntoIter<u8> {
    fn read_u8(&mut self) -> Result<u8, ReaderErr> {
        self.next().ok_or(ReaderErr::NotEnoughData)
    }

    fn read_u32(&mut self) -> Result<u32, ReaderErr> {
        let out = [
            self.next().ok_or(ReaderErr::NotEnoughData)?,
            self.next().ok_or(ReaderErr::NotEnoughData)?,
            self.next().ok_or(ReaderErr::NotEnoughData)?,
            self.next().ok_or(ReaderErr::NotEnoughData)?
        ];
        Ok(u32::from_le_bytes(out))
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.len())
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderErr {
    #[error("Not enough data to read")]
    NotEnoughData,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_read_mixed_values() {
        let mut buffer = Vec::new();
        buffer.write_u8(7);
        buffer.write_u16(0xBEEF);
        buffer.write_u32(123_456_789);
        buffer.write_u64(u64::MAX - 3);
        buffer.write_i64(-42);
        buffer.write_f64(-0.125);
        assert_eq!(buffer.len(), 1 + 2 + 4 + 8 + 8 + 8);

        let mut reader = buffer.into_iter();
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_u32().unwrap(), 123_456_789);
        assert_eq!(reader.read_u64().unwrap(), u64::MAX - 3);
        assert_eq!(reader.read_i64().unwrap(), -42);
        assert_eq!(reader.read_f64().unwrap(), -0.125);
        assert_eq!(reader.remaining(), Some(0));
        assert_eq!(reader.read_u8(), Err(ReaderErr::NotEnoughData));
    }

    #[test]
    fn little_endian_layout() {
        let mut buffer = Vec::new();
        buffer.write_u32(0x0403_0201);
        assert_eq!(buffer, vec![1, 2, 3, 4]);
    }

    #[test]
    fn truncated_u64() {
        let mut reader = vec![1_u8, 2, 3, 4, 5].into_iter();
        assert_eq!(reader.read_u64(), Err(ReaderErr::NotEnoughData));
    }
}
