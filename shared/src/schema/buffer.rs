//! Little-endian byte writer and reader used by the schema codec.

use super::CodecError;

/// Growable output buffer for one frame.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buffer: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Packs up to eight flags into one byte, first flag in the lowest bit.
    pub fn write_bits(&mut self, flags: &[bool]) {
        debug_assert!(flags.len() <= 8);
        let byte = flags
            .iter()
            .enumerate()
            .fold(0u8, |acc, (bit, set)| if *set { acc | (1 << bit) } else { acc });
        self.buffer.push(byte);
    }

    /// Writes a u16 byte length followed by the UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        let len = u16::try_from(value.len()).map_err(|_| CodecError::OutOfRange {
            path: "string".to_string(),
            value: value.len() as f64,
        })?;
        self.write_u16(len);
        self.buffer.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn build(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over a received frame.
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn read(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.position + n > self.data.len() {
            return Err(CodecError::UnexpectedEnd {
                position: self.position,
            });
        }
        let slice = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(slice)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        self.read(1).map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        self.read_array().map(i8::from_le_bytes)
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        self.read_array().map(i16::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.read_array().map(f32::from_le_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        self.read_array().map(f64::from_le_bytes)
    }

    pub fn read_bits(&mut self) -> Result<[bool; 8], CodecError> {
        let byte = self.read_u8()?;
        let mut bits = [false; 8];
        for (bit, flag) in bits.iter_mut().enumerate() {
            *flag = byte & (1 << bit) != 0;
        }
        Ok(bits)
    }

    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_u16()? as usize;
        let bytes = self.read(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn has_remaining(&self) -> bool {
        self.position < self.data.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_are_little_endian() {
        let mut writer = ByteWriter::new();
        writer.write_u16(0x0102);
        writer.write_i32(-2);
        assert_eq!(writer.build(), vec![0x02, 0x01, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_bits_pack_low_bit_first() {
        let mut writer = ByteWriter::new();
        writer.write_bits(&[true, false, true]);
        let data = writer.build();
        assert_eq!(data, vec![0b101]);

        let mut reader = ByteReader::new(&data);
        let bits = reader.read_bits().unwrap();
        assert_eq!(&bits[..3], &[true, false, true]);
        assert!(!bits[3..].iter().any(|b| *b));
    }

    #[test]
    fn test_read_past_end() {
        let data = [1u8];
        let mut reader = ByteReader::new(&data);
        assert!(matches!(
            reader.read_u32(),
            Err(CodecError::UnexpectedEnd { position: 0 })
        ));
    }

    #[test]
    fn test_string_roundtrip() {
        let mut writer = ByteWriter::new();
        writer.write_string("Ann").unwrap();
        let data = writer.build();
        assert_eq!(data.len(), 5);

        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_string().unwrap(), "Ann");
        assert!(!reader.has_remaining());
    }
}
