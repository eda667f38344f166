use sqlx::PgConnection;
use uuid::Uuid;

use crate::domain::aggregates::{Review, SiteReview, UserReview};
use crate::domain::value_objects::Rating;
use crate::Result;

pub struct NewReview<'a> {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub rating: Rating,
    pub title: Option<&'a str>,
    pub comment: &'a str,
    pub is_verified_purchase: bool,
}

/// Inserts an approved review. `None` when the user already reviewed the product.
pub async fn insert(conn: &mut PgConnection, review: &NewReview<'_>) -> Result<Option<Review>> {
    Ok(sqlx::query_as::<_, Review>(
        "INSERT INTO reviews (id, user_id, product_id, rating, title, comment, is_verified_purchase, is_approved) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE) ON CONFLICT (user_id, product_id) DO NOTHING RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(review.user_id)
    .bind(review.product_id)
    .bind(review.rating.as_i16())
    .bind(review.title)
    .bind(review.comment)
    .bind(review.is_verified_purchase)
    .fetch_optional(conn).await?)
}

pub async fn find(conn: &mut PgConnection, id: Uuid) -> Result<Option<Review>> {
    Ok(sqlx::query_as::<_, Review>("SELECT * FROM reviews WHERE id = $1").bind(id).fetch_optional(conn).await?)
}

pub async fn update(conn: &mut PgConnection, id: Uuid, rating: Rating, title: Option<&str>, comment: &str) -> Result<Review> {
    Ok(sqlx::query_as::<_, Review>(
        "UPDATE reviews SET rating = $2, title = $3, comment = $4, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id).bind(rating.as_i16()).bind(title).bind(comment)
    .fetch_one(conn).await?)
}

pub async fn delete(conn: &mut PgConnection, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM review_helpful_votes WHERE review_id = $1").bind(id).execute(&mut *conn).await?;
    sqlx::query("DELETE FROM reviews WHERE id = $1").bind(id).execute(&mut *conn).await?;
    Ok(())
}

pub async fn set_approval(conn: &mut PgConnection, id: Uuid, is_approved: bool) -> Result<Review> {
    Ok(sqlx::query_as::<_, Review>("UPDATE reviews SET is_approved = $2, updated_at = NOW() WHERE id = $1 RETURNING *")
        .bind(id).bind(is_approved)
        .fetch_one(conn).await?)
}

pub async fn approved_ratings(conn: &mut PgConnection, product_id: Uuid) -> Result<Vec<i16>> {
    Ok(sqlx::query_scalar::<_, i16>("SELECT rating FROM reviews WHERE product_id = $1 AND is_approved")
        .bind(product_id).fetch_all(conn).await?)
}

pub async fn approved_for_product(conn: &mut PgConnection, product_id: Uuid) -> Result<Vec<Review>> {
    Ok(sqlx::query_as::<_, Review>(
        "SELECT * FROM reviews WHERE product_id = $1 AND is_approved ORDER BY created_at DESC, id DESC",
    )
    .bind(product_id).fetch_all(conn).await?)
}

pub async fn for_user(conn: &mut PgConnection, user_id: Uuid) -> Result<Vec<UserReview>> {
    Ok(sqlx::query_as::<_, UserReview>(
        "SELECT r.*, p.name AS product_name, p.slug AS product_slug, p.image AS product_image \
         FROM reviews r JOIN products p ON p.id = r.product_id \
         WHERE r.user_id = $1 ORDER BY r.created_at DESC, r.id DESC",
    )
    .bind(user_id).fetch_all(conn).await?)
}

/// Records a helpful vote. `false` when the user had already voted.
pub async fn insert_vote(conn: &mut PgConnection, review_id: Uuid, user_id: Uuid) -> Result<bool> {
    let done = sqlx::query(
        "INSERT INTO review_helpful_votes (id, user_id, review_id) VALUES ($1, $2, $3) ON CONFLICT (user_id, review_id) DO NOTHING",
    )
    .bind(Uuid::now_v7()).bind(user_id).bind(review_id)
    .execute(conn).await?;
    Ok(done.rows_affected() == 1)
}

/// Sets helpful_count from the vote rows and returns it.
pub async fn refresh_helpful_count(conn: &mut PgConnection, review_id: Uuid) -> Result<i32> {
    Ok(sqlx::query_scalar::<_, i32>(
        "UPDATE reviews SET helpful_count = (SELECT COUNT(*) FROM review_helpful_votes WHERE review_id = $1)::int \
         WHERE id = $1 RETURNING helpful_count",
    )
    .bind(review_id).fetch_one(conn).await?)
}

// -----------------------------------------------------------------------------
// Site reviews
// -----------------------------------------------------------------------------

pub async fn insert_site_review(
    conn: &mut PgConnection,
    user_id: Option<Uuid>,
    name: Option<&str>,
    rating: Rating,
    comment: &str,
) -> Result<SiteReview> {
    Ok(sqlx::query_as::<_, SiteReview>(
        "INSERT INTO site_reviews (id, user_id, name, rating, comment, is_approved) VALUES ($1, $2, $3, $4, $5, TRUE) RETURNING *",
    )
    .bind(Uuid::now_v7()).bind(user_id).bind(name).bind(rating.as_i16()).bind(comment)
    .fetch_one(conn).await?)
}

pub async fn approved_site_reviews(conn: &mut PgConnection, limit: i64) -> Result<Vec<SiteReview>> {
    Ok(sqlx::query_as::<_, SiteReview>(
        "SELECT * FROM site_reviews WHERE is_approved ORDER BY created_at DESC, id DESC LIMIT $1",
    )
    .bind(limit).fetch_all(conn).await?)
}

pub async fn approved_site_ratings(conn: &mut PgConnection) -> Result<Vec<i16>> {
    Ok(sqlx::query_scalar::<_, i16>("SELECT rating FROM site_reviews WHERE is_approved").fetch_all(conn).await?)
}
