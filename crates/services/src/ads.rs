//! Ad use cases: listing, retrieval and owner-only mutation.

use std::sync::Arc;

use domains::policy::ensure_can_mutate;
use domains::{
    Ad, AdChanges, AdFilter, AdId, AdInput, AdPatch, AdRepository, AppError, Page, PageRequest,
    RawBody, Result, UserId,
};

pub struct AdService {
    ads: Arc<dyn AdRepository>,
}

impl AdService {
    pub fn new(ads: Arc<dyn AdRepository>) -> Self {
        Self { ads }
    }

    /// Lists every ad matching `filter`. Page 1 always exists, later pages
    /// past the end are reported as not found.
    pub async fn list(&self, filter: &AdFilter, page: PageRequest) -> Result<Page<Ad>> {
        let result = self.ads.list(filter, page).await?;
        if result.is_out_of_range() {
            return Err(AppError::not_found("Page", page.page));
        }
        Ok(result)
    }

    pub async fn get(&self, id: AdId) -> Result<Ad> {
        self.ads
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found("Ad", id))
    }

    pub async fn create(&self, owner: UserId, input: AdInput) -> Result<Ad> {
        let new_ad = input.validate()?;
        let ad = self.ads.insert(owner, new_ad).await?;
        tracing::info!(ad_id = %ad.id, owner = %owner, category = %ad.category, "ad created");
        Ok(ad)
    }

    /// Full replacement of the mutable fields (PUT). The body is only read
    /// once the caller is known to own the ad.
    pub async fn replace(&self, caller: UserId, id: AdId, body: RawBody) -> Result<Ad> {
        self.authorize(caller, id).await?;
        let changes = AdChanges::from(body.decode::<AdInput>()?.validate()?);
        self.apply(caller, id, changes).await
    }

    /// Changes only the supplied fields (PATCH).
    pub async fn patch(&self, caller: UserId, id: AdId, body: RawBody) -> Result<Ad> {
        self.authorize(caller, id).await?;
        let changes = body.decode::<AdPatch>()?.validate()?;
        self.apply(caller, id, changes).await
    }

    pub async fn delete(&self, caller: UserId, id: AdId) -> Result<()> {
        self.authorize(caller, id).await?;
        if !self.ads.delete(id).await? {
            return Err(AppError::not_found("Ad", id));
        }
        tracing::info!(ad_id = %id, owner = %caller, "ad deleted along with its proposals");
        Ok(())
    }

    /// Existence first, ownership second; validation comes after both.
    async fn authorize(&self, caller: UserId, id: AdId) -> Result<Ad> {
        let ad = self.get(id).await?;
        ensure_can_mutate(&ad, caller)?;
        Ok(ad)
    }

    async fn apply(&self, caller: UserId, id: AdId, changes: AdChanges) -> Result<Ad> {
        let ad = self
            .ads
            .update(id, changes)
            .await?
            .ok_or_else(|| AppError::not_found("Ad", id))?;
        tracing::info!(ad_id = %id, owner = %caller, "ad updated");
        Ok(ad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{Condition, MockAdRepository};
    use mockall::predicate::eq;
    use serde_json::json;

    fn ad(id: i64, owner: i64) -> Ad {
        Ad {
            id: AdId(id),
            user_id: UserId(owner),
            title: "Bike".to_string(),
            description: "Red city bike".to_string(),
            image_url: None,
            category: "Sport".to_string(),
            condition: Condition::New,
            created_at: Utc::now(),
        }
    }

    fn input() -> AdInput {
        AdInput {
            title: Some("Bike".to_string()),
            description: Some("Red city bike".to_string()),
            image_url: None,
            category: Some("Sport".to_string()),
            condition: Some("new".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_caller_as_owner() {
        let mut repo = MockAdRepository::new();
        repo.expect_insert()
            .withf(|owner, new_ad| *owner == UserId(5) && new_ad.condition == Condition::New)
            .times(1)
            .returning(|owner, _| Ok(ad(1, owner.0)));

        let service = AdService::new(Arc::new(repo));
        let created = service.create(UserId(5), input()).await.unwrap();
        assert_eq!(created.user_id, UserId(5));
    }

    #[tokio::test]
    async fn test_create_with_bad_condition_writes_nothing() {
        let mut repo = MockAdRepository::new();
        repo.expect_insert().never();

        let service = AdService::new(Arc::new(repo));
        let mut bad = input();
        bad.condition = Some("mint".to_string());
        let err = service.create(UserId(5), bad).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let mut repo = MockAdRepository::new();
        repo.expect_find()
            .with(eq(AdId(1)))
            .returning(|_| Ok(Some(ad(1, 10))));
        repo.expect_update().never();
        repo.expect_delete().never();

        let service = AdService::new(Arc::new(repo));
        let body = RawBody::from(json!({
            "title": "x", "description": "x", "category": "x", "condition": "new"
        }));
        let err = service.replace(UserId(11), AdId(1), body).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = service.delete(UserId(11), AdId(1)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_ownership_is_checked_before_validation() {
        let mut repo = MockAdRepository::new();
        repo.expect_find().returning(|_| Ok(Some(ad(1, 10))));

        let service = AdService::new(Arc::new(repo));
        let err = service
            .replace(UserId(11), AdId(1), RawBody::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let mistyped = RawBody::from(json!({ "title": 5, "condition": ["new"] }));
        let err = service.patch(UserId(11), AdId(1), mistyped).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_existence_is_checked_before_the_body_is_read() {
        let mut repo = MockAdRepository::new();
        repo.expect_find().returning(|_| Ok(None));
        repo.expect_update().never();

        let service = AdService::new(Arc::new(repo));
        let mistyped = RawBody::from(json!({ "condition": ["new"] }));
        let err = service.replace(UserId(1), AdId(4242), mistyped).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_owner_with_mistyped_field_gets_field_error() {
        let mut repo = MockAdRepository::new();
        repo.expect_find().returning(|_| Ok(Some(ad(1, 10))));
        repo.expect_update().never();

        let service = AdService::new(Arc::new(repo));
        let body = RawBody::from(json!({ "title": 5 }));
        match service.patch(UserId(10), AdId(1), body).await.unwrap_err() {
            AppError::ValidationError(errors) => assert!(errors.has("title")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_ad_is_not_found() {
        let mut repo = MockAdRepository::new();
        repo.expect_find().returning(|_| Ok(None));

        let service = AdService::new(Arc::new(repo));
        let err = service.delete(UserId(1), AdId(99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));
    }

    #[tokio::test]
    async fn test_owner_patch_passes_changes_through() {
        let mut repo = MockAdRepository::new();
        repo.expect_find().returning(|_| Ok(Some(ad(1, 10))));
        repo.expect_update()
            .withf(|id, changes| {
                *id == AdId(1)
                    && changes.title.as_deref() == Some("Tandem")
                    && changes.condition.is_none()
            })
            .times(1)
            .returning(|id, changes| {
                let mut updated = ad(id.0, 10);
                changes.apply(&mut updated);
                Ok(Some(updated))
            });

        let service = AdService::new(Arc::new(repo));
        let patch = RawBody::from(json!({ "title": "Tandem" }));
        let updated = service.patch(UserId(10), AdId(1), patch).await.unwrap();
        assert_eq!(updated.title, "Tandem");
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_not_found() {
        let mut repo = MockAdRepository::new();
        repo.expect_list().returning(|_, request| {
            Ok(Page {
                items: vec![],
                total: 3,
                request,
            })
        });

        let service = AdService::new(Arc::new(repo));
        let err = service
            .list(&AdFilter::default(), PageRequest { page: 2, page_size: 10 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(..)));

        let first = service
            .list(&AdFilter::default(), PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(first.total, 3);
    }
}
