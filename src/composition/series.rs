use crate::composition::model::{NodeDef, SequenceDef, SeriesDef};
use crate::foundation::core::FrameSpan;
use crate::foundation::error::{WavyteError, WavyteResult};

/// Lay out a series as back-to-back sequences.
///
/// `from_0 = offset_0` and `from_i = from_{i-1} + duration_{i-1} + offset_i`. Every child must be a
/// `series_sequence`; only the last one may have an infinite duration.
pub fn layout_series(series: &SeriesDef) -> WavyteResult<Vec<SequenceDef>> {
    let mut out = Vec::with_capacity(series.children.len());
    let mut cursor: i64 = 0;
    let last = series.children.len().saturating_sub(1);

    for (i, child) in series.children.iter().enumerate() {
        let NodeDef::SeriesSequence(entry) = child else {
            return Err(WavyteError::validation(format!(
                "series children must be 'series_sequence' nodes, found '{}' at index {i}",
                child.kind_name()
            )));
        };

        let from = cursor.checked_add(entry.offset).ok_or_else(|| {
            WavyteError::validation(format!("series entry {i} start overflows"))
        })?;

        match entry.duration_in_frames {
            FrameSpan::Finite(0) => {
                return Err(WavyteError::validation(format!(
                    "series entry {i} duration_in_frames must be > 0"
                )));
            }
            FrameSpan::Finite(d) => {
                let d = i64::try_from(d).map_err(|_| {
                    WavyteError::validation(format!("series entry {i} duration is too large"))
                })?;
                cursor = from.checked_add(d).ok_or_else(|| {
                    WavyteError::validation(format!("series entry {i} end overflows"))
                })?;
            }
            FrameSpan::Infinite if i != last => {
                return Err(WavyteError::validation(format!(
                    "series entry {i} has an infinite duration but is not the last entry"
                )));
            }
            FrameSpan::Infinite => {}
        }

        out.push(SequenceDef {
            id: entry.id.clone(),
            name: Some(
                entry
                    .name
                    .clone()
                    .unwrap_or_else(|| "series_sequence".to_owned()),
            ),
            from,
            duration_in_frames: entry.duration_in_frames,
            playback_rate: 1.0,
            track_index: 0,
            premount_for: entry.premount_for,
            children: entry.children.clone(),
        });
    }

    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/composition/series.rs"]
mod tests;
