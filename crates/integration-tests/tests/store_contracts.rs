//! The in-memory store must agree with the reference filter semantics that
//! the domain defines on `AdFilter::matches` / `ProposalFilter::matches`.

use domains::{
    AdFilter, AdRepository, Condition, NewAd, NewProposal, PageRequest, ProposalFilter,
    ProposalRepository, ProposalStatus, UserId,
};
use storage_adapters::InMemoryStore;

fn ad(title: &str, description: &str, category: &str, condition: Condition) -> NewAd {
    NewAd {
        title: title.to_owned(),
        description: description.to_owned(),
        image_url: None,
        category: category.to_owned(),
        condition,
    }
}

#[test]
fn test_listing_agrees_with_filter_semantics() {
    tokio_test::block_on(async {
        let store = InMemoryStore::new();
        let fixtures = [
            ad("Велосипед", "горный", "Спорт", Condition::Used),
            ad("Шлем", "для велосипеда", "Спорт", Condition::New),
            ad("Лампа", "настольная", "Дом", Condition::New),
            ad("BIKE", "road bike", "Sport", Condition::Used),
        ];
        let mut all = Vec::new();
        for fixture in fixtures {
            all.push(AdRepository::insert(&store, UserId(1), fixture).await.unwrap());
        }

        let filters = [
            AdFilter::default(),
            AdFilter {
                search: Some("велосипед".into()),
                ..AdFilter::default()
            },
            AdFilter {
                search: Some("bike".into()),
                ..AdFilter::default()
            },
            AdFilter {
                category: Some("Спорт".into()),
                condition: Some(Condition::New),
                ..AdFilter::default()
            },
        ];
        for filter in filters {
            let page = AdRepository::list(&store, &filter, PageRequest::first(100))
                .await
                .unwrap();
            let expected: Vec<_> = all.iter().filter(|ad| filter.matches(ad)).cloned().collect();
            assert_eq!(page.items, expected, "{filter:?}");
            assert_eq!(page.total, expected.len() as u64);
        }
    });
}

#[test]
fn test_status_update_is_visible_through_filters() {
    tokio_test::block_on(async {
        let store = InMemoryStore::new();
        let a = AdRepository::insert(&store, UserId(1), ad("A", "a", "x", Condition::New))
            .await
            .unwrap();
        let b = AdRepository::insert(&store, UserId(2), ad("B", "b", "x", Condition::New))
            .await
            .unwrap();
        let proposal = ProposalRepository::insert(
            &store,
            NewProposal {
                ad_sender_id: a.id,
                ad_receiver_id: b.id,
                comment: "swap".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(proposal.status, ProposalStatus::Pending);

        store
            .update_status(proposal.id, ProposalStatus::Declined)
            .await
            .unwrap();

        let declined = ProposalFilter {
            status: Some(ProposalStatus::Declined),
            ..ProposalFilter::default()
        };
        let pending = ProposalFilter {
            status: Some(ProposalStatus::Pending),
            ..ProposalFilter::default()
        };
        assert_eq!(store.list_for_participant(UserId(2), &declined).await.unwrap().len(), 1);
        assert!(store.list_for_participant(UserId(2), &pending).await.unwrap().is_empty());
    });
}
