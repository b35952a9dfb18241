//! The single dashboard page, rendered on the server.

use std::fmt::Write;

use angrybird_dataset::{Column, VideoRecord};

use crate::insight::{ChatMessage, Role};
use crate::query::{RowQuery, SortKey, SortOrder, MAX_DISPLAY_ROWS};
use crate::stats::{HashtagStat, Summary};
use crate::trends::KeywordTrend;

/// Escape text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Trend lookup result shown under the keyword search box.
#[derive(Debug)]
pub enum TrendPanel {
    Results {
        keyword: String,
        trends: Vec<KeywordTrend>,
    },
    Failed {
        keyword: String,
        message: String,
    },
}

/// Everything the page shows. Panels are independent: a failed panel
/// carries its own message and the rest still render.
pub struct PageView<'a> {
    /// Set when the spreadsheet could not be read.
    pub load_error: Option<String>,
    pub summary: Summary,
    /// Every row matching `query`, already sorted.
    pub rows: &'a [VideoRecord],
    pub query: &'a RowQuery,
    pub top_hashtags: &'a [HashtagStat],
    pub trends: Option<TrendPanel>,
    pub chat: &'a [ChatMessage],
    /// Set when insights cannot work at all (no API key).
    pub insight_notice: Option<String>,
}

const STYLE: &str = r#"
body { font-family: -apple-system, "Segoe UI", Roboto, sans-serif; margin: 0; display: flex; }
aside { width: 240px; padding: 20px; background: #f4f4f6; min-height: 100vh; box-sizing: border-box; }
aside label { display: block; margin-top: 12px; font-size: .9em; }
aside input, aside select { width: 100%; box-sizing: border-box; }
main { flex: 1; padding: 20px 30px; overflow-x: auto; }
h1 { margin: 0 0 16px; }
section { margin-bottom: 32px; }
table { border-collapse: collapse; font-size: .85em; }
th, td { border: 1px solid #ddd; padding: 4px 8px; text-align: left; vertical-align: top; }
.metrics { display: flex; gap: 24px; flex-wrap: wrap; }
.metric b { display: block; font-size: 1.4em; }
.error { color: #8a1f11; background: #fbe3e4; padding: 10px; border-radius: 5px; }
.user-message { color: #006400; background: #e0f2e0; padding: 10px; border-radius: 5px; margin-bottom: 5px; }
.bot-message { color: #4b2e2e; background: #f0e5e5; padding: 10px; border-radius: 5px; margin-bottom: 5px; white-space: pre-wrap; }
.up { color: green; } .down { color: red; } .crowded { color: #b8860b; } .open { color: green; }
"#;

pub fn render_page(view: &PageView<'_>) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">");
    html.push_str("<title>AngryBird dashboard</title><style>");
    html.push_str(STYLE);
    html.push_str("</style></head><body>");

    render_sidebar(&mut html, view.query);

    html.push_str("<main><h1>AngryBird</h1>");
    html.push_str(r#"<form method="get" action="/"><button>Reload Data</button></form>"#);

    match view.load_error {
        Some(ref message) => {
            let _ = write!(
                html,
                r#"<p class="error">{}</p><p>No data available. Run the scraper to generate data.</p>"#,
                escape(message)
            );
        }
        None => {
            render_summary(&mut html, &view.summary);
            render_table(&mut html, view.rows, view.query);
            render_hashtags(&mut html, view.top_hashtags, view.query);
        }
    }

    render_trends(&mut html, view.trends.as_ref());
    render_chat(&mut html, view.chat, view.insight_notice.as_deref());

    html.push_str("</main></body></html>");
    html
}

fn render_sidebar(html: &mut String, query: &RowQuery) {
    html.push_str(r#"<aside><h3>Filter Options</h3><form method="get" action="/">"#);
    let _ = write!(
        html,
        r#"<label>Uploader<input name="uploader" value="{}"></label>"#,
        escape(query.uploader.as_deref().unwrap_or(""))
    );
    let _ = write!(
        html,
        r#"<label>Minimum Likes<input type="number" min="0" name="min_likes" value="{}"></label>"#,
        query.min_likes
    );
    let _ = write!(
        html,
        r#"<label>Minimum Comments<input type="number" min="0" name="min_comments" value="{}"></label>"#,
        query.min_comments
    );
    html.push_str(r#"<label>Sort By<select name="sort">"#);
    for key in SortKey::ALL {
        let _ = write!(
            html,
            r#"<option value="{}"{}>{}</option>"#,
            key.key(),
            if key == query.sort { " selected" } else { "" },
            key.label()
        );
    }
    html.push_str("</select></label><label>Sort Order<select name=\"order\">");
    for (order, value, label) in [
        (SortOrder::Ascending, "ascending", "Ascending"),
        (SortOrder::Descending, "descending", "Descending"),
    ] {
        let _ = write!(
            html,
            r#"<option value="{}"{}>{}</option>"#,
            value,
            if order == query.order { " selected" } else { "" },
            label
        );
    }
    html.push_str("</select></label><p><button>Apply</button></p></form></aside>");
}

fn render_summary(html: &mut String, summary: &Summary) {
    let _ = write!(
        html,
        "<section><p>Number of results: {}</p><div class=\"metrics\">",
        summary.videos
    );
    let metrics = [
        ("Total likes", summary.total_likes.to_string()),
        ("Average likes", format!("{:.1}", summary.average_likes)),
        ("Total comments", summary.total_comments.to_string()),
        ("Average comments", format!("{:.1}", summary.average_comments)),
        ("Total shares", summary.total_shares.to_string()),
        ("Engagement per video", format!("{:.1}", summary.engagement_per_video)),
    ];
    for (label, value) in metrics {
        let _ = write!(html, r#"<div class="metric">{}<b>{}</b></div>"#, label, value);
    }
    html.push_str("</div></section>");
}

/// Escaped text of one column, as the export writes it.
fn cell(r: &VideoRecord, column: Column) -> String {
    match column {
        Column::Id => escape(&r.id),
        Column::Uploader => escape(&r.author),
        Column::UploadDate => r.upload_date_text(),
        Column::Description => escape(&r.description),
        Column::Hashtags => escape(&r.hashtags.join(" ")),
        Column::Likes => r.likes.to_string(),
        Column::Comments => r.comments.to_string(),
        Column::Favorites => r.favorites.to_string(),
        Column::Shares => r.shares.to_string(),
        Column::Music => escape(&r.music),
    }
}

fn render_table(html: &mut String, rows: &[VideoRecord], query: &RowQuery) {
    let _ = write!(
        html,
        "<section><h2>Videos</h2><p>{} matching rows{}. <a href=\"/download?{}\">Download Filtered Data as Excel</a></p>",
        rows.len(),
        if rows.len() > MAX_DISPLAY_ROWS {
            format!(", first {} shown", MAX_DISPLAY_ROWS)
        } else {
            String::new()
        },
        escape(&query.to_query_string())
    );
    html.push_str("<table><tr>");
    for column in Column::ALL {
        let _ = write!(html, "<th>{}</th>", column.header());
    }
    html.push_str("</tr>");
    for r in rows.iter().take(MAX_DISPLAY_ROWS) {
        html.push_str("<tr>");
        for column in Column::ALL {
            let _ = write!(html, "<td>{}</td>", cell(r, column));
        }
        html.push_str("</tr>");
    }
    html.push_str("</table></section>");
}

fn render_hashtags(html: &mut String, top: &[HashtagStat], query: &RowQuery) {
    html.push_str("<section><h2>Hashtags</h2>");
    if top.is_empty() {
        html.push_str("<p>No hashtags found in descriptions.</p></section>");
        return;
    }
    let _ = write!(
        html,
        r#"<img src="/chart/hashtags.svg?{}" alt="Top hashtags by engagement">"#,
        escape(&query.to_query_string())
    );
    html.push_str("<h3>Most used</h3><table><tr><th>Hashtag</th><th>Videos</th><th>Likes</th><th>Comments</th><th>Shares</th></tr>");
    for stat in top {
        let _ = write!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&stat.tag),
            stat.videos,
            stat.likes,
            stat.comments,
            stat.shares
        );
    }
    html.push_str("</table></section>");
}

fn render_trends(html: &mut String, panel: Option<&TrendPanel>) {
    let keyword = match panel {
        Some(TrendPanel::Results { keyword, .. }) | Some(TrendPanel::Failed { keyword, .. }) => {
            keyword.as_str()
        }
        None => "",
    };
    let _ = write!(
        html,
        r#"<section><h2>Search Keyword Data</h2><form method="get" action="/"><input name="keyword" value="{}" placeholder="Enter a keyword to search"> <button>Search</button></form>"#,
        escape(keyword)
    );

    match panel {
        None => {}
        Some(TrendPanel::Failed { message, .. }) => {
            let _ = write!(html, r#"<p class="error">{}</p>"#, escape(message));
        }
        Some(TrendPanel::Results { trends, .. }) if trends.is_empty() => {
            html.push_str("<p>No results found.</p>");
        }
        Some(TrendPanel::Results { trends, .. }) => {
            html.push_str("<table><tr><th>Keyword</th><th>Volume</th><th>Trend</th><th>Competition</th><th>Low Bid</th><th>High Bid</th></tr>");
            for t in trends {
                let trend = if t.is_rising() {
                    format!(r#"<span class="up">⬆ {}%</span>"#, t.trend)
                } else {
                    format!(r#"<span class="down">⬇ {}%</span>"#, t.trend)
                };
                let _ = write!(
                    html,
                    r#"<tr><td>{}</td><td>{}</td><td>{}</td><td><span class="{}">{}</span></td><td>{:.2}</td><td>{:.2}</td></tr>"#,
                    escape(&t.keyword),
                    t.volume,
                    trend,
                    if t.is_crowded() { "crowded" } else { "open" },
                    t.competition,
                    t.low_bid,
                    t.high_bid
                );
            }
            html.push_str("</table>");
        }
    }
    html.push_str("</section>");
}

fn render_chat(html: &mut String, chat: &[ChatMessage], notice: Option<&str>) {
    html.push_str("<section><h2>Chat with the Data Bot</h2>");
    if let Some(notice) = notice {
        let _ = write!(html, r#"<p class="error">{}</p>"#, escape(notice));
    }
    for message in chat {
        let (class, who) = match message.role {
            Role::User => ("user-message", "USER"),
            Role::Bot => ("bot-message", "BOT"),
        };
        let _ = write!(
            html,
            r#"<div class="{}"><strong>[{}]:</strong> {}<br><small>{}</small></div>"#,
            class,
            who,
            escape(&message.content),
            escape(&message.timestamp)
        );
    }
    html.push_str(r#"<form method="post" action="/chat"><input name="question" size="80" placeholder="Type your message here"> <button>Send</button></form></section>"#);
}
