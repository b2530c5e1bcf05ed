use anyhow::Context;
use audiobook_store::{
    db::{create_orm_conn, run_migrations},
    entity::books::{self, Entity as Books},
    models::to_minor_units,
};
use chrono::Utc;
use sea_orm::{EntityTrait, Set, sea_query::OnConflict};

struct SeedBook {
    id: &'static str,
    title: &'static str,
    author: &'static str,
    description: &'static str,
    price: f64,
    cover_image: &'static str,
    drive_link: &'static str,
}

const COVER: &str = "https://images.unsplash.com/photo-1544947950-fa07a98d237f?q=80&w=1000";

const CATALOG: &[SeedBook] = &[
    SeedBook {
        id: "cmbhtanwy0001hquxlzqt8m4n",
        title: "The Art of War",
        author: "Sun Tzu",
        description: "An ancient treatise on strategy, read in full.",
        price: 1.0,
        cover_image: COVER,
        drive_link: "https://drive.google.com/file/d/1oArN5Fv-ba463PkvAatZTIVYNCYC90OZ/view?usp=drive_link",
    },
    SeedBook {
        id: "cmbhtanwy0001hquxjbdjwlzqt8m4n",
        title: "The Art of War, Part 2",
        author: "Sun Tzu",
        description: "The second half of the treatise with commentary.",
        price: 1.0,
        cover_image: COVER,
        drive_link: "https://drive.google.com/file/d/1ZFr0AkVZxIjvZMnm3sN34ObrH1M-qptE/view?usp=drive_link",
    },
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;

    let orm = create_orm_conn(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let now = Utc::now();
    let models = CATALOG.iter().map(|book| books::ActiveModel {
        id: Set(book.id.to_string()),
        title: Set(book.title.to_string()),
        author: Set(book.author.to_string()),
        description: Set(book.description.to_string()),
        price: Set(to_minor_units(book.price)),
        cover_image: Set(book.cover_image.to_string()),
        drive_link: Set(Some(book.drive_link.to_string())),
        created_at: Set(now.into()),
    });

    // Purchases reference books, so existing rows are updated in place.
    Books::insert_many(models)
        .on_conflict(
            OnConflict::column(books::Column::Id)
                .update_columns([
                    books::Column::Title,
                    books::Column::Author,
                    books::Column::Description,
                    books::Column::Price,
                    books::Column::CoverImage,
                    books::Column::DriveLink,
                ])
                .to_owned(),
        )
        .exec(&orm)
        .await?;

    println!("Seed completed: {} books", CATALOG.len());
    Ok(())
}
