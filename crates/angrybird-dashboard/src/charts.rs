//! Server-side SVG charts.

use plotters::prelude::*;

use crate::stats::HashtagStat;
use crate::{Error, Result};

const SIZE: (u32, u32) = (860, 420);

/// Bar slots per hashtag: one per series plus a gap.
const GROUP: i32 = 4;

const SERIES: [(&str, RGBColor); 3] = [
    ("Likes", RGBColor(0x63, 0x6e, 0xfa)),
    ("Comments", RGBColor(0xef, 0x55, 0x3b)),
    ("Shares", RGBColor(0x00, 0xcc, 0x96)),
];

fn values(stat: &HashtagStat) -> [u64; 3] {
    [stat.likes, stat.comments, stat.shares]
}

/// Grouped bars of likes, comments and shares per hashtag.
pub fn hashtag_engagement_chart(stats: &[HashtagStat]) -> Result<String> {
    let mut svg = String::new();
    draw(&mut svg, stats).map_err(|e| Error::Chart(e.to_string()))?;
    Ok(svg)
}

fn draw(svg: &mut String, stats: &[HashtagStat]) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let caption = format!("Top {} Hashtags by Engagement", stats.len());

    if stats.is_empty() {
        root.draw(&Text::new(caption, (20, 24), ("sans-serif", 20).into_font()))?;
        root.draw(&Text::new(
            "No hashtags found in descriptions.",
            (SIZE.0 as i32 / 2 - 110, SIZE.1 as i32 / 2),
            ("sans-serif", 14)
                .into_font()
                .color(&RGBColor(0x66, 0x66, 0x66)),
        ))?;
        root.present()?;
        return Ok(());
    }

    let slots = stats.len() as i32 * GROUP;
    let max = stats.iter().flat_map(values).max().unwrap_or(0).max(1);

    let mut chart = ChartBuilder::on(&root)
        .caption(caption, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d((0..slots).into_segmented(), 0u64..max + max / 10 + 1)?;

    // one label per group, under the middle bar
    let label = |v: &SegmentValue<i32>| match v {
        SegmentValue::CenterOf(slot) if slot % GROUP == 1 => stats
            .get((slot / GROUP) as usize)
            .map(|s| s.tag.clone())
            .unwrap_or_default(),
        _ => String::new(),
    };
    let count = |v: &u64| compact(*v as f64);
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(slots as usize)
        .x_label_formatter(&label)
        .y_label_formatter(&count)
        .draw()?;

    for (j, (name, color)) in SERIES.iter().enumerate() {
        let color = *color;
        chart
            .draw_series(stats.iter().enumerate().map(|(i, stat)| {
                let x = i as i32 * GROUP + j as i32;
                Rectangle::new(
                    [
                        (SegmentValue::Exact(x), 0),
                        (SegmentValue::Exact(x + 1), values(stat)[j]),
                    ],
                    color.filled(),
                )
            }))?
            .label(*name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// 1234 -> "1.2K", 2500000 -> "2.5M".
fn compact(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value)
    }
}
