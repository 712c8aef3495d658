use super::ui;
use crate::core::listing::{Listing, ListingOrder};
use crate::core::session::QuerySession;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};

impl Listing {
    /// Renders the listing as a terminal table numbered from 1.
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("#"),
            ui::header_cell("Title"),
            ui::header_cell("Author"),
            ui::header_cell("Comments"),
            ui::header_cell("URL"),
        ]);

        for (i, row) in self.rows.iter().enumerate() {
            table.add_row(vec![
                Cell::new(i + 1).set_alignment(CellAlignment::Right),
                Cell::new(&row.title),
                ui::format_optional_cell(row.author.as_deref(), str::to_string)
                    .set_alignment(CellAlignment::Left),
                Cell::new(row.comments).set_alignment(CellAlignment::Right),
                Cell::new(&row.url),
            ]);
        }

        table.to_string()
    }
}

pub async fn run(
    session: &QuerySession,
    order: ListingOrder,
    forum: &str,
    limit: usize,
    html: bool,
) -> Result<()> {
    let pb = ui::new_spinner(&format!("Fetching {order} posts from r/{forum}..."));
    let result = session.list_posts(order, forum, limit).await;
    pb.finish_and_clear();
    let listing = result?;

    if html {
        println!("{}", listing.to_html());
        return Ok(());
    }

    println!(
        "{}\n",
        ui::style_text(
            &format!("{} posts on r/{}", capitalise(&order.to_string()), forum),
            ui::StyleType::Title
        )
    );
    if listing.is_empty() {
        println!("{}", ui::style_text("No posts found.", ui::StyleType::Subtle));
    } else {
        println!("{}", listing.display_as_table());
    }
    Ok(())
}

fn capitalise(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
