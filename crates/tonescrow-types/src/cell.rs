//! Bit-level cell codec.
//!
//! A [`Cell`] holds up to 1023 data bits and up to 4 child references. Every
//! message body and every persisted record in TonEscrow is a tree of cells.
//! [`CellBuilder`] writes big-endian fields MSB-first; [`CellSlice`] reads
//! them back in the same order.
//!
//! ## Field encodings
//!
//! ```text
//! uint(n)      n bits, big-endian
//! coins        len(4) || len bytes big-endian       (len <= 15)
//! address      00                                   (none)
//!              10 || anycast(1)=0 || wc(8) || hash(256)
//! ```

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::{
    Address, Coins, EscrowError, Result,
    constants::{CELL_MAX_BITS, CELL_MAX_REFS, COINS_MAX_BYTES},
};

/// Immutable tree node: data bits plus child references.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl Cell {
    /// The empty cell (no bits, no refs).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of data bits.
    #[must_use]
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Child references.
    #[must_use]
    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// `true` when the cell carries neither bits nor refs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs.is_empty()
    }

    /// Start reading this cell from the first bit.
    #[must_use]
    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice {
            cell: self,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    /// Representation hash.
    ///
    /// `SHA-256(refs(1) || bit_len(2, BE) || data || for each ref: hash(ref))`
    #[must_use]
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([self.refs.len() as u8]);
        hasher.update((self.bit_len as u16).to_be_bytes());
        hasher.update(&self.data);
        for child in &self.refs {
            hasher.update(child.hash());
        }
        let result = hasher.finalize();
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&result);
        hash
    }

    fn bit(&self, index: usize) -> bool {
        self.data[index / 8] & (0x80 >> (index % 8)) != 0
    }
}

// ---------------------------------------------------------------------------
// CellBuilder
// ---------------------------------------------------------------------------

/// Incremental writer for a single [`Cell`].
///
/// Every `store_*` method checks capacity before writing, so a failed store
/// leaves the builder unchanged.
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits still available in this cell.
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        CELL_MAX_BITS - self.bit_len
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self> {
        self.ensure_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store the low `bits` bits of `value`, big-endian.
    ///
    /// # Errors
    /// - `CellOverflow` if the cell has fewer than `bits` bits left
    /// - `InvalidPayload` if `value` does not fit in `bits` bits
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(EscrowError::InvalidPayload {
                reason: format!("{value} does not fit in {bits} bits"),
            });
        }
        self.ensure_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_u32(&mut self, value: u32) -> Result<&mut Self> {
        self.store_uint(u128::from(value), 32)
    }

    pub fn store_u64(&mut self, value: u64) -> Result<&mut Self> {
        self.store_uint(u128::from(value), 64)
    }

    /// Store raw bytes (8 bits each).
    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.ensure_bits(bytes.len() * 8)?;
        for byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// Store a coin amount as `len(4) || len bytes`.
    ///
    /// # Errors
    /// Returns `AmountOverflow` if the amount needs more than 15 bytes.
    pub fn store_coins(&mut self, coins: Coins) -> Result<&mut Self> {
        let nano = coins.nano();
        let len = (128 - nano.leading_zeros() as usize).div_ceil(8);
        if len > COINS_MAX_BYTES {
            return Err(EscrowError::AmountOverflow);
        }
        self.ensure_bits(4 + len * 8)?;
        self.store_uint(len as u128, 4)?;
        self.store_uint(nano, len * 8)
    }

    /// Store an optional standard address (`None` encodes as `00`).
    pub fn store_address(&mut self, address: Option<&Address>) -> Result<&mut Self> {
        match address {
            None => self.store_uint(0, 2),
            Some(addr) => {
                self.ensure_bits(2 + 1 + 8 + 256)?;
                self.store_uint(0b10, 2)?;
                self.store_bit(false)?;
                self.store_uint(u128::from(addr.workchain as u8), 8)?;
                self.store_bytes(&addr.hash)
            }
        }
    }

    /// Attach a child cell.
    ///
    /// # Errors
    /// Returns `CellOverflow` if the cell already has 4 references.
    pub fn store_ref(&mut self, cell: Cell) -> Result<&mut Self> {
        if self.refs.len() >= CELL_MAX_REFS {
            return Err(EscrowError::CellOverflow {
                reason: format!("more than {CELL_MAX_REFS} references"),
            });
        }
        self.refs.push(Arc::new(cell));
        Ok(self)
    }

    /// Finish the cell.
    #[must_use]
    pub fn build(self) -> Cell {
        Cell {
            data: self.data,
            bit_len: self.bit_len,
            refs: self.refs,
        }
    }

    fn ensure_bits(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(EscrowError::CellOverflow {
                reason: format!(
                    "need {bits} bits, {} of {CELL_MAX_BITS} left",
                    self.remaining_bits()
                ),
            });
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            self.data[self.bit_len / 8] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }
}

// ---------------------------------------------------------------------------
// CellSlice
// ---------------------------------------------------------------------------

/// Read cursor over a [`Cell`].
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    #[must_use]
    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len - self.bit_pos
    }

    pub fn load_bit(&mut self) -> Result<bool> {
        self.ensure_bits(1)?;
        let bit = self.cell.bit(self.bit_pos);
        self.bit_pos += 1;
        Ok(bit)
    }

    /// Read `bits` bits (at most 128) as a big-endian unsigned integer.
    pub fn load_uint(&mut self, bits: usize) -> Result<u128> {
        if bits > 128 {
            return Err(EscrowError::InvalidPayload {
                reason: format!("cannot read {bits}-bit integer"),
            });
        }
        self.ensure_bits(bits)?;
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | u128::from(self.cell.bit(self.bit_pos));
            self.bit_pos += 1;
        }
        Ok(value)
    }

    pub fn load_u32(&mut self) -> Result<u32> {
        // load_uint(32) never exceeds u32::MAX.
        self.load_uint(32).map(|v| v as u32)
    }

    pub fn load_u64(&mut self) -> Result<u64> {
        self.load_uint(64).map(|v| v as u64)
    }

    /// Read the next 32 bits without advancing.
    pub fn peek_u32(&self) -> Result<u32> {
        self.clone().load_u32()
    }

    pub fn load_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_bits(N * 8)?;
        let mut out = [0u8; N];
        for byte in &mut out {
            *byte = self.load_uint(8)? as u8;
        }
        Ok(out)
    }

    pub fn load_coins(&mut self) -> Result<Coins> {
        let len = self.load_uint(4)? as usize;
        self.load_uint(len * 8).map(Coins::from_nano)
    }

    /// Read an optional standard address.
    ///
    /// # Errors
    /// - `InvalidAddress` for external/variable addresses or anycast
    /// - `CellUnderflow` if the slice is too short
    pub fn load_address(&mut self) -> Result<Option<Address>> {
        match self.load_uint(2)? {
            0b00 => Ok(None),
            0b10 => {
                if self.load_bit()? {
                    return Err(EscrowError::InvalidAddress {
                        reason: "anycast addresses are not supported".into(),
                    });
                }
                let workchain = self.load_uint(8)? as u8 as i8;
                let hash = self.load_bytes::<32>()?;
                Ok(Some(Address::new(workchain, hash)))
            }
            tag => Err(EscrowError::InvalidAddress {
                reason: format!("unsupported address tag {tag:#04b}"),
            }),
        }
    }

    /// Read an address that must be present.
    pub fn load_required_address(&mut self, field: &str) -> Result<Address> {
        self.load_address()?
            .ok_or_else(|| EscrowError::InvalidPayload {
                reason: format!("{field} address is empty"),
            })
    }

    /// Take the next child reference.
    pub fn load_ref(&mut self) -> Result<&'a Cell> {
        let child = self
            .cell
            .refs
            .get(self.ref_pos)
            .ok_or_else(|| EscrowError::CellUnderflow {
                reason: format!("reference {} missing", self.ref_pos),
            })?;
        self.ref_pos += 1;
        Ok(child.as_ref())
    }

    fn ensure_bits(&self, bits: usize) -> Result<()> {
        if bits > self.remaining_bits() {
            return Err(EscrowError::CellUnderflow {
                reason: format!("need {bits} bits, {} left", self.remaining_bits()),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_fields_read_back_in_order() {
        let mut b = CellBuilder::new();
        b.store_u32(0xcb03_bfaf).unwrap().store_bit(true).unwrap();
        b.store_uint(5, 3).unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), 36);

        let mut s = cell.parse();
        assert_eq!(s.load_u32().unwrap(), 0xcb03_bfaf);
        assert!(s.load_bit().unwrap());
        assert_eq!(s.load_uint(3).unwrap(), 5);
        assert_eq!(s.remaining_bits(), 0);
    }

    #[test]
    fn coins_use_minimal_length() {
        let mut b = CellBuilder::new();
        b.store_coins(Coins::ZERO).unwrap();
        assert_eq!(b.clone().build().bit_len(), 4);
        b.store_coins(Coins::from_coins(100)).unwrap();
        let cell = b.build();
        // 100e9 needs 5 bytes.
        assert_eq!(cell.bit_len(), 4 + 4 + 40);

        let mut s = cell.parse();
        assert_eq!(s.load_coins().unwrap(), Coins::ZERO);
        assert_eq!(s.load_coins().unwrap(), Coins::from_coins(100));
    }

    #[test]
    fn coins_above_max_rejected() {
        let mut b = CellBuilder::new();
        let err = b.store_coins(Coins::from_nano(u128::MAX)).unwrap_err();
        assert!(matches!(err, EscrowError::AmountOverflow));
        b.store_coins(Coins::MAX).unwrap();
    }

    #[test]
    fn address_none_and_std() {
        let addr = Address::new(-1, [0xab; 32]);
        let mut b = CellBuilder::new();
        b.store_address(None).unwrap();
        b.store_address(Some(&addr)).unwrap();
        let cell = b.build();
        assert_eq!(cell.bit_len(), 2 + 267);

        let mut s = cell.parse();
        assert_eq!(s.load_address().unwrap(), None);
        assert_eq!(s.load_address().unwrap(), Some(addr));
    }

    #[test]
    fn required_address_rejects_none() {
        let mut b = CellBuilder::new();
        b.store_address(None).unwrap();
        let cell = b.build();
        let err = cell.parse().load_required_address("worker").unwrap_err();
        assert!(matches!(err, EscrowError::InvalidPayload { ref reason } if reason.contains("worker")));
    }

    #[test]
    fn underflow_on_short_slice() {
        let mut b = CellBuilder::new();
        b.store_uint(1, 8).unwrap();
        let cell = b.build();
        let err = cell.parse().load_u32().unwrap_err();
        assert!(matches!(err, EscrowError::CellUnderflow { .. }));
        let err = cell.parse().load_ref().unwrap_err();
        assert!(matches!(err, EscrowError::CellUnderflow { .. }));
    }

    #[test]
    fn overflow_on_bit_1024() {
        let mut b = CellBuilder::new();
        for _ in 0..1023 {
            b.store_bit(false).unwrap();
        }
        let err = b.store_bit(true).unwrap_err();
        assert!(matches!(err, EscrowError::CellOverflow { .. }));
        assert_eq!(b.build().bit_len(), 1023);
    }

    #[test]
    fn overflow_on_fifth_ref() {
        let mut b = CellBuilder::new();
        for _ in 0..4 {
            b.store_ref(Cell::empty()).unwrap();
        }
        let err = b.store_ref(Cell::empty()).unwrap_err();
        assert!(matches!(err, EscrowError::CellOverflow { .. }));
    }

    #[test]
    fn value_wider_than_field_rejected() {
        let mut b = CellBuilder::new();
        assert!(b.store_uint(8, 3).is_err());
        assert_eq!(b.build().bit_len(), 0);
    }

    #[test]
    fn hash_covers_children() {
        let leaf = |bit| {
            let mut b = CellBuilder::new();
            b.store_bit(bit).unwrap();
            b.build()
        };
        let parent = |bit| {
            let mut b = CellBuilder::new();
            b.store_ref(leaf(bit)).unwrap();
            b.build()
        };
        assert_eq!(parent(true).hash(), parent(true).hash());
        assert_ne!(parent(true).hash(), parent(false).hash());
        assert_ne!(Cell::empty().hash(), leaf(false).hash());
    }

    #[test]
    fn peek_does_not_advance() {
        let mut b = CellBuilder::new();
        b.store_u32(7).unwrap();
        let cell = b.build();
        let s = cell.parse();
        assert_eq!(s.peek_u32().unwrap(), 7);
        assert_eq!(s.remaining_bits(), 32);
    }
}
