/// Elements with a width (eg. when used in an `OffsetVec`)
pub trait Width {
    fn width(&self) -> usize;
}

/// Offset into an `OffsetVec`
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct Offset(pub usize);

/// A vector of elements of different logical "widths", where offsets into the
/// vector are given in terms of the sum of the widths of the previous elements
/// (as opposed to the number of preceding elements).
///
/// This is how JVM class files index their constant pools: most entries have
/// width 1, but `long` and `double` entries take two slots.
#[derive(Clone)]
pub struct OffsetVec<T: Sized> {
    /// Entries, along with their offset
    entries: Vec<(Offset, T)>,

    /// Offset of the next element to be added
    offset_len: Offset,
}

impl<T: Sized + Width> OffsetVec<T> {
    /// New empty offset vector
    pub fn new() -> OffsetVec<T> {
        OffsetVec::new_starting_at(Offset(0))
    }

    /// New empty offset vector, with a custom starting offset
    pub fn new_starting_at(initial_offset: Offset) -> OffsetVec<T> {
        OffsetVec {
            entries: vec![],
            offset_len: initial_offset,
        }
    }

    /// Length of the `OffsetVec` (aka. number of entries)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Is the vector devoid of entries?
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current offset size of the `OffsetVec` (aka. offset of the next element
    /// to be added)
    pub fn offset_len(&self) -> Offset {
        self.offset_len
    }

    /// Add an entry to the back
    pub fn push(&mut self, slot: T) -> Offset {
        let offset = self.offset_len;
        self.offset_len.0 += slot.width();
        self.entries.push((offset, slot));

        offset
    }

    /// Iterate over entries and their offsets
    pub fn iter(&self) -> impl Iterator<Item = (Offset, &T)> {
        self.entries.iter().map(|(off, elem)| (*off, elem))
    }
}

impl<T: Width> Default for OffsetVec<T> {
    fn default() -> Self {
        OffsetVec::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    impl Width for u64 {
        fn width(&self) -> usize {
            if *self > u32::MAX as u64 {
                2
            } else {
                1
            }
        }
    }

    #[test]
    fn offsets_account_for_widths() {
        let mut vec: OffsetVec<u64> = OffsetVec::new_starting_at(Offset(1));
        assert_eq!(vec.push(3), Offset(1));
        assert_eq!(vec.push(u64::MAX), Offset(2));
        assert_eq!(vec.push(4), Offset(4));
        assert_eq!(vec.offset_len(), Offset(5));
        assert_eq!(vec.len(), 3);
    }
}
