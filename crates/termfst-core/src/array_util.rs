// Growth policy for reusable arrays
//
// Scratch arrays in the builder are grown, never shrunk. `oversize` picks the
// new capacity: about 1/8 extra headroom, rounded so the allocation lands on
// an 8-byte boundary for small element types.

use crate::CoreError;

/// Largest element count any grown array may reach.
pub const MAX_ARRAY_LENGTH: usize = i32::MAX as usize - 16;

/// Returns a capacity of at least `min_target_size` elements.
///
/// Fails with [`CoreError::SizeOverflow`] when `min_target_size` exceeds
/// [`MAX_ARRAY_LENGTH`].
pub fn oversize(min_target_size: usize, bytes_per_element: usize) -> Result<usize, CoreError> {
    if min_target_size == 0 {
        return Ok(0);
    }
    if min_target_size > MAX_ARRAY_LENGTH {
        return Err(CoreError::SizeOverflow {
            requested: min_target_size,
        });
    }

    let extra = (min_target_size >> 3).max(3);
    let new_size = min_target_size + extra;
    if new_size + 7 > MAX_ARRAY_LENGTH {
        return Ok(MAX_ARRAY_LENGTH);
    }

    Ok(match bytes_per_element {
        4 => (new_size + 1) & !1,
        2 => (new_size + 3) & !3,
        1 => (new_size + 7) & !7,
        _ => new_size,
    })
}

/// Grows `vec` to at least `min_size` elements, filling new slots with
/// `make(index)`. Existing elements are kept in place.
pub fn grow_with<T>(
    vec: &mut Vec<T>,
    min_size: usize,
    mut make: impl FnMut(usize) -> T,
) -> Result<(), CoreError> {
    if vec.len() >= min_size {
        return Ok(());
    }
    let new_len = oversize(min_size, std::mem::size_of::<T>())?;
    vec.reserve_exact(new_len - vec.len());
    for i in vec.len()..new_len {
        vec.push(make(i));
    }
    Ok(())
}

/// [`grow_with`] filling with `T::default()`.
pub fn grow<T: Default>(vec: &mut Vec<T>, min_size: usize) -> Result<(), CoreError> {
    grow_with(vec, min_size, |_| T::default())
}
