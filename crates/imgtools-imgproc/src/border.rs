/// How pixels outside the image are read by neighborhood operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderMode {
    /// Mirror excluding the edge pixel.
    ///
    /// Example: ...d c b | a b c d...
    #[default]
    Reflect101,

    /// Repeat the outermost row or column.
    ///
    /// Example: ...a a a | a b c d...
    Replicate,

    /// Outside pixels are skipped by the operation.
    Constant,
}

impl BorderMode {
    #[inline]
    fn reflect101(i: isize, len: usize) -> usize {
        if len == 1 {
            return 0;
        }
        let len = len as isize;
        let mut i = i;
        while i < 0 || i >= len {
            if i < 0 {
                i = -i;
            } else {
                i = 2 * len - i - 2;
            }
        }
        i as usize
    }

    /// Maps index `i` to a valid index within `[0, len)`.
    ///
    /// Returns `None` for [`BorderMode::Constant`] when `i` is outside the range.
    #[inline]
    pub fn map_index(&self, i: isize, len: usize) -> Option<usize> {
        if i >= 0 && (i as usize) < len {
            return Some(i as usize);
        }
        match self {
            BorderMode::Reflect101 => Some(Self::reflect101(i, len)),
            BorderMode::Replicate => Some(i.clamp(0, len as isize - 1) as usize),
            BorderMode::Constant => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BorderMode;

    #[test]
    fn test_map_index() {
        let b = BorderMode::Reflect101;
        assert_eq!(b.map_index(-1, 4), Some(1));
        assert_eq!(b.map_index(-2, 4), Some(2));
        assert_eq!(b.map_index(4, 4), Some(2));
        assert_eq!(b.map_index(5, 4), Some(1));
        assert_eq!(b.map_index(3, 1), Some(0));

        let r = BorderMode::Replicate;
        assert_eq!(r.map_index(-3, 4), Some(0));
        assert_eq!(r.map_index(9, 4), Some(3));

        assert_eq!(BorderMode::Constant.map_index(-1, 4), None);
        assert_eq!(BorderMode::Constant.map_index(2, 4), Some(2));
    }
}
