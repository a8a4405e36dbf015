//! Stable top-down merge sort.
//!
//! O(n log n) comparisons with one auxiliary buffer of `n` elements. On ties
//! the element from the left run is taken first, so equal elements keep their
//! relative order.

use std::cmp::Ordering;

/// Runs at or below this length are insertion-sorted.
const INSERTION_CUTOFF: usize = 12;

/// Sort `items` in place with `cmp`, stably.
pub fn merge_sort<T, F>(items: &mut [T], mut cmp: F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() < 2 {
        return;
    }
    let mut aux = items.to_vec();
    sort_range(items, &mut aux, &mut cmp);
}

fn sort_range<T, F>(items: &mut [T], aux: &mut [T], cmp: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let n = items.len();
    if n <= INSERTION_CUTOFF {
        insertion_sort(items, cmp);
        return;
    }
    let mid = n / 2;
    {
        let (left, right) = items.split_at_mut(mid);
        let (aux_left, aux_right) = aux.split_at_mut(mid);
        sort_range(left, aux_left, cmp);
        sort_range(right, aux_right, cmp);
    }
    // Already ordered across the seam.
    if cmp(&items[mid - 1], &items[mid]) != Ordering::Greater {
        return;
    }
    aux[..n].copy_from_slice(items);
    merge(&aux[..mid], &aux[mid..n], items, cmp);
}

fn merge<T, F>(left: &[T], right: &[T], out: &mut [T], cmp: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    let (mut i, mut j) = (0, 0);
    for slot in out.iter_mut() {
        let take_left = j >= right.len()
            || (i < left.len() && cmp(&left[i], &right[j]) != Ordering::Greater);
        if take_left {
            *slot = left[i];
            i += 1;
        } else {
            *slot = right[j];
            j += 1;
        }
    }
}

fn insertion_sort<T, F>(items: &mut [T], cmp: &mut F)
where
    T: Copy,
    F: FnMut(&T, &T) -> Ordering,
{
    for i in 1..items.len() {
        let current = items[i];
        let mut j = i;
        while j > 0 && cmp(&items[j - 1], &current) == Ordering::Greater {
            items[j] = items[j - 1];
            j -= 1;
        }
        items[j] = current;
    }
}
