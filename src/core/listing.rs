//! Forum post listings.

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

pub const DEFAULT_FORUM: &str = "wallstreetbets";
pub const DEFAULT_LIMIT: usize = 100;

/// Provider-defined ranking used to list a forum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingOrder {
    Hot,
    Rising,
    New,
}

impl Display for ListingOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ListingOrder::Hot => "hot",
                ListingOrder::Rising => "rising",
                ListingOrder::New => "new",
            }
        )
    }
}

impl FromStr for ListingOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(ListingOrder::Hot),
            "rising" => Ok(ListingOrder::Rising),
            "new" => Ok(ListingOrder::New),
            _ => Err(anyhow!("Invalid listing order: {}", s)),
        }
    }
}

/// A post as delivered by the discussion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub title: String,
    pub author: Option<String>,
    pub num_comments: u64,
    pub url: String,
}

/// One row of a listing table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRow {
    pub title: String,
    pub author: Option<String>,
    pub comments: u64,
    pub url: String,
    /// `url` wrapped in an anchor tag.
    pub link: String,
}

impl From<Post> for PostRow {
    fn from(post: Post) -> Self {
        let link = make_clickable(&post.url);
        PostRow {
            title: post.title,
            author: post.author,
            comments: post.num_comments,
            url: post.url,
            link,
        }
    }
}

/// Posts of a forum in provider order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub forum: String,
    pub order: ListingOrder,
    pub rows: Vec<PostRow>,
}

impl Listing {
    pub fn new(forum: &str, order: ListingOrder, posts: Vec<Post>) -> Self {
        Listing {
            forum: forum.to_string(),
            order,
            rows: posts.into_iter().map(PostRow::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders an HTML table numbered from 1. Text cells are escaped, the url
    /// cell carries the clickable link as-is.
    pub fn to_html(&self) -> String {
        let mut html = String::from(
            "<table>\n<thead>\n<tr><th></th><th>title</th><th>author</th><th>comments</th><th>url</th></tr>\n</thead>\n<tbody>\n",
        );
        for (i, row) in self.rows.iter().enumerate() {
            html.push_str(&format!(
                "<tr><th>{}</th><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                i + 1,
                escape_html(&row.title),
                row.author.as_deref().map(escape_html).unwrap_or_default(),
                row.comments,
                row.link
            ));
        }
        html.push_str("</tbody>\n</table>");
        html
    }
}

pub fn make_clickable(url: &str) -> String {
    format!(r#"<a href="{url}">{url}</a>"#)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
