//! Trigger-level scans over the closed bars of a window.
//!
//! Every function here takes `closed`, the enriched bars strictly before
//! today, and the index the current leg was entered on. None of them look at
//! today's bar. A level is "changed" at i when it differs from i-1, with
//! two unset values counting as unchanged.

use crate::engine::EnrichedBar;

fn changed(a: Option<f64>, b: Option<f64>) -> bool {
    a != b
}

/// First index in `from..` holding the largest set value of `field`.
fn first_argmax(
    closed: &[EnrichedBar],
    from: usize,
    field: impl Fn(&EnrichedBar) -> Option<f64>,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, bar) in closed.iter().enumerate().skip(from) {
        if let Some(v) = field(bar) {
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((i, v)),
            }
        }
    }
    best.map(|(i, _)| i)
}

/// First index in `from..` holding the smallest set value of `field`.
fn first_argmin(
    closed: &[EnrichedBar],
    from: usize,
    field: impl Fn(&EnrichedBar) -> Option<f64>,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, bar) in closed.iter().enumerate().skip(from) {
        if let Some(v) = field(bar) {
            match best {
                Some((_, b)) if v >= b => {}
                _ => best = Some((i, v)),
            }
        }
    }
    best.map(|(i, _)| i)
}

/// Long entry trigger: the price high at the most significant ASI high,
/// once the latest ASI has crossed above it or above the latest swing high.
pub fn entry_long(closed: &[EnrichedBar], entry_index: usize) -> Option<f64> {
    let last = closed.last()?;
    if !last.adxr_buy_gate {
        return None;
    }
    let m = first_argmax(closed, entry_index, |b| b.hsp)?;
    let significant = closed[m].hsp?;
    let asi = last.asi?;
    let crossed = asi > significant || last.hsp.is_some_and(|h| asi > h);
    if crossed {
        closed[m].hip
    } else {
        None
    }
}

/// Short entry trigger: mirror of [`entry_long`] on ASI lows.
pub fn entry_short(closed: &[EnrichedBar], entry_index: usize) -> Option<f64> {
    let last = closed.last()?;
    if !last.adxr_buy_gate {
        return None;
    }
    let m = first_argmin(closed, entry_index, |b| b.lsp)?;
    let significant = closed[m].lsp?;
    let asi = last.asi?;
    let crossed = asi < significant || last.lsp.is_some_and(|l| asi < l);
    if crossed {
        closed[m].lop
    } else {
        None
    }
}

/// Long trailing stop: the low of the first bar after the trade's highest
/// ASI swing high where ASI has fallen more than `threshold` below it,
/// provided no new ASI swing low appeared in between.
pub fn trailing_sar_long(closed: &[EnrichedBar], entry_index: usize, threshold: f64) -> Option<f64> {
    let m = first_argmax(closed, entry_index, |b| b.hsp)?;
    let peak = closed[m].hsp?;
    for i in m..closed.len() {
        if i > 0 && changed(closed[i].lsp, closed[i - 1].lsp) {
            break;
        }
        if let Some(asi) = closed[i].asi {
            if peak - asi > threshold {
                return Some(closed[i].bar.low);
            }
        }
    }
    None
}

/// Short trailing stop: mirror of [`trailing_sar_long`].
pub fn trailing_sar_short(closed: &[EnrichedBar], entry_index: usize, threshold: f64) -> Option<f64> {
    let m = first_argmin(closed, entry_index, |b| b.lsp)?;
    let trough = closed[m].lsp?;
    for i in m..closed.len() {
        if i > 0 && changed(closed[i].hsp, closed[i - 1].hsp) {
            break;
        }
        if let Some(asi) = closed[i].asi {
            if asi - trough > threshold {
                return Some(closed[i].bar.high);
            }
        }
    }
    None
}

/// Long stop-and-reverse level.
///
/// Walks back from the latest closed bar to the most recent ASI swing-high
/// update, then forward to the first ASI swing-low update after it. The level
/// is the price low confirmed with that swing low (same bar or the next),
/// falling back to that bar's low. If no update pair exists the latest
/// confirmed price low is used.
pub fn sar_long(closed: &[EnrichedBar], entry_index: usize) -> Option<f64> {
    reversal_level(
        closed,
        entry_index,
        |b| b.hsp,
        |b| b.lsp,
        |b| b.lop,
        |b| b.bar.low,
    )
    .or_else(|| closed.last().and_then(|b| b.lop))
}

/// Short stop-and-reverse level: mirror of [`sar_long`].
pub fn sar_short(closed: &[EnrichedBar], entry_index: usize) -> Option<f64> {
    reversal_level(
        closed,
        entry_index,
        |b| b.lsp,
        |b| b.hsp,
        |b| b.hip,
        |b| b.bar.high,
    )
    .or_else(|| closed.last().and_then(|b| b.hip))
}

fn reversal_level(
    closed: &[EnrichedBar],
    entry_index: usize,
    outer: impl Fn(&EnrichedBar) -> Option<f64>,
    inner: impl Fn(&EnrichedBar) -> Option<f64>,
    price_level: impl Fn(&EnrichedBar) -> Option<f64>,
    price: impl Fn(&EnrichedBar) -> f64,
) -> Option<f64> {
    let n = closed.len();
    if n == 0 {
        return None;
    }
    for i in ((entry_index + 1)..n).rev() {
        if !changed(outer(&closed[i]), outer(&closed[i - 1])) {
            continue;
        }
        for j in i..n {
            if !changed(inner(&closed[j]), inner(&closed[j - 1])) {
                continue;
            }
            if changed(price_level(&closed[j]), price_level(&closed[j - 1])) {
                return price_level(&closed[j]);
            }
            if j + 1 < n && changed(price_level(&closed[j + 1]), price_level(&closed[j])) {
                return price_level(&closed[j + 1]);
            }
            return Some(price(&closed[j]));
        }
    }
    None
}
