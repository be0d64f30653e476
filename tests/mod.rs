use std::cell::RefCell;
use std::collections::HashSet;
use std::fs;

use anyhow::Error;
use person_repo::*;

async fn spawn_repository(instance_name: &str) -> Result<PersonRepository, Error> {
    let person = Person::entity();
    let store = Store::new();
    store
        .add_instance(
            instance_name,
            &format!("./db/test_{}.json", instance_name),
            vec![person.clone()],
        )
        .await?;
    store.delete_many(&person, Query::All).await?;
    Ok(PersonRepository::new(store))
}

fn burrito_lovers() -> Vec<NewPerson> {
    vec![
        NewPerson::new("Mary").age(41).favorite_foods(["Burrito", "Salad"]),
        NewPerson::new("Alice").age(25).favorite_foods(["Burrito"]),
        NewPerson::new("Bob").age(33).favorite_foods(["Pizza", "Burrito"]),
        NewPerson::new("Zed").age(52).favorite_foods(["Pizza"]),
    ]
}

#[tokio::test]
async fn create_person() -> Result<(), Error> {
    let repository = spawn_repository("create_person").await?;
    let john = repository.create_person().await?;
    assert!(NewPerson::sample().describes(&john));
    assert_eq!(john.version, 0);

    let found = repository.find_person_by_id(&john.id).await?;
    assert_eq!(found, Some(john));
    Ok(())
}

#[tokio::test]
async fn create_many_people() -> Result<(), Error> {
    let repository = spawn_repository("create_many_people").await?;
    let people = burrito_lovers();
    let created = repository.create_many_people(people.clone()).await?;
    assert_eq!(created.len(), people.len());
    for (new_person, person) in people.iter().zip(&created) {
        assert!(new_person.describes(person));
    }

    let ids: HashSet<&PersonId> = created.iter().map(|person| &person.id).collect();
    assert_eq!(ids.len(), people.len());
    Ok(())
}

#[tokio::test]
async fn create_many_people_empty_batch() -> Result<(), Error> {
    let repository = spawn_repository("create_many_empty").await?;
    let created = repository.create_many_people(vec![]).await?;
    assert!(created.is_empty());
    Ok(())
}

#[tokio::test]
async fn find_people_by_name() -> Result<(), Error> {
    let repository = spawn_repository("find_people_by_name").await?;
    repository.create_many_people(burrito_lovers()).await?;
    repository.create_one(NewPerson::new("Mary").age(19)).await?;

    let first = repository.find_people_by_name("Mary").await?;
    let second = repository.find_people_by_name("Mary").await?;
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
    assert!(first.iter().all(|person| person.name == "Mary"));

    let none = repository.find_people_by_name("Nobody").await?;
    assert!(none.is_empty());
    Ok(())
}

#[tokio::test]
async fn find_one_by_food() -> Result<(), Error> {
    let repository = spawn_repository("find_one_by_food").await?;
    let john = repository.create_person().await?;
    repository.create_many_people(burrito_lovers()).await?;

    let found = repository.find_one_by_food("Pizza").await?;
    assert_eq!(found, Some(john));

    let found = repository.find_one_by_food("Burrito").await?;
    assert_eq!(found.map(|person| person.name), Some("Mary".to_string()));

    assert_eq!(repository.find_one_by_food("Sushi").await?, None);
    Ok(())
}

#[tokio::test]
async fn find_person_by_id_missing() -> Result<(), Error> {
    let repository = spawn_repository("find_by_id_missing").await?;
    let id: PersonId = "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse()?;
    assert_eq!(repository.find_person_by_id(&id).await?, None);
    assert!(matches!(
        "not-an-id".parse::<PersonId>(),
        Err(RepositoryError::InvalidId(_))
    ));
    Ok(())
}

#[tokio::test]
async fn find_edit_then_save() -> Result<(), Error> {
    let repository = spawn_repository("find_edit_then_save").await?;
    let john = repository.create_person().await?;

    let edited = repository.find_edit_then_save(&john.id).await?;
    assert_eq!(edited.favorite_foods, vec!["Pizza", "Burger", EDIT_FOOD]);
    assert_eq!(edited.version, 1);

    let edited = repository.find_edit_then_save(&john.id).await?;
    assert_eq!(
        edited.favorite_foods,
        vec!["Pizza", "Burger", EDIT_FOOD, EDIT_FOOD]
    );
    assert_eq!(edited.version, 2);
    assert_eq!(edited.name, john.name);
    assert_eq!(edited.age, john.age);

    let stored = repository.find_person_by_id(&john.id).await?;
    assert_eq!(stored, Some(edited));
    Ok(())
}

#[tokio::test]
async fn find_edit_then_save_missing() -> Result<(), Error> {
    let repository = spawn_repository("edit_then_save_missing").await?;
    let id: PersonId = "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse()?;
    let result = repository.find_edit_then_save(&id).await;
    assert!(matches!(result, Err(RepositoryError::NotFound(missing)) if missing == id));
    Ok(())
}

#[tokio::test]
async fn save_rejects_stale_person() -> Result<(), Error> {
    let repository = spawn_repository("save_stale").await?;
    let mary = repository
        .create_one(NewPerson::new("Mary").age(41).favorite_foods(["Burrito"]))
        .await?;

    let mut stale = repository
        .find_person_by_id(&mary.id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Mary was not stored"))?;
    repository.find_and_update("Mary").await?;

    stale.favorite_foods.push(EDIT_FOOD.to_string());
    let result = repository.save(&stale).await;
    assert!(matches!(result, Err(RepositoryError::Conflict(id)) if id == mary.id));

    let stored = repository.find_person_by_id(&mary.id).await?;
    let stored = stored.ok_or_else(|| anyhow::anyhow!("Mary was removed"))?;
    assert_eq!(stored.favorite_foods, vec!["Burrito"]);
    assert_eq!(stored.age, Some(UPDATED_AGE));
    Ok(())
}

#[tokio::test]
async fn save_writes_cleared_age() -> Result<(), Error> {
    let repository = spawn_repository("save_cleared_age").await?;
    let mut john = repository.create_person().await?;

    john.age = None;
    let saved = repository.save(&john).await?;
    assert_eq!(saved.age, None);
    assert_eq!(saved.version, 1);

    let stored = repository.find_person_by_id(&john.id).await?;
    assert_eq!(stored.and_then(|person| person.age), None);
    Ok(())
}

#[tokio::test]
async fn find_and_update() -> Result<(), Error> {
    let repository = spawn_repository("find_and_update").await?;
    let created = repository.create_many_people(burrito_lovers()).await?;

    let updated = repository
        .find_and_update("Mary")
        .await?
        .ok_or_else(|| anyhow::anyhow!("Mary was not updated"))?;
    assert_eq!(updated.id, created[0].id);
    assert_eq!(updated.age, Some(UPDATED_AGE));
    assert_eq!(updated.favorite_foods, created[0].favorite_foods);

    let stored = repository.find_person_by_id(&updated.id).await?;
    assert_eq!(stored, Some(updated));

    assert_eq!(repository.find_and_update("Nobody").await?, None);
    Ok(())
}

#[tokio::test]
async fn remove_by_id() -> Result<(), Error> {
    let repository = spawn_repository("remove_by_id").await?;
    let john = repository.create_person().await?;

    let removed = repository.remove_by_id(&john.id).await?;
    assert_eq!(removed, Some(john.clone()));
    assert_eq!(repository.find_person_by_id(&john.id).await?, None);
    assert_eq!(repository.remove_by_id(&john.id).await?, None);
    Ok(())
}

#[tokio::test]
async fn remove_many_people() -> Result<(), Error> {
    let repository = spawn_repository("remove_many_people").await?;
    repository.create_many_people(burrito_lovers()).await?;
    repository.create_one(NewPerson::new("Mary")).await?;

    let summary = repository.remove_many_people().await?;
    assert_eq!(summary, DeleteSummary { deleted_count: 2 });
    assert!(repository.find_people_by_name(REMOVE_NAME).await?.is_empty());
    assert_eq!(repository.find_people_by_name("Alice").await?.len(), 1);

    let summary = repository.remove_many_people().await?;
    assert_eq!(summary.deleted_count, 0);
    assert_eq!(
        serde_json::to_value(summary)?,
        serde_json::json!({"deletedCount": 0})
    );
    Ok(())
}

#[tokio::test]
async fn query_chain() -> Result<(), Error> {
    let repository = spawn_repository("query_chain").await?;
    repository.create_many_people(burrito_lovers()).await?;

    let people = repository.query_chain().await?;
    assert!(people.len() <= QUERY_LIMIT as usize);
    let names: Vec<&str> = people.iter().map(|person| person.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
    for person in &people {
        assert_eq!(person.age, None);
        assert!(person.favorite_foods.iter().any(|food| food == QUERY_FOOD));
    }

    let stored = repository.find_people_by_name("Alice").await?;
    assert_eq!(stored[0].age, Some(25));
    Ok(())
}

#[tokio::test]
async fn query_chain_no_matches() -> Result<(), Error> {
    let repository = spawn_repository("query_chain_empty").await?;
    repository.create_person().await?;
    assert!(repository.query_chain().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn validation_failures_write_nothing() -> Result<(), Error> {
    let repository = spawn_repository("validation").await?;

    let result = repository.create_one(NewPerson::new("").age(3)).await;
    assert!(matches!(result, Err(RepositoryError::Validation(_))));

    let batch = vec![NewPerson::new("Carol"), NewPerson::new("")];
    let result = repository.create_many_people(batch).await;
    assert!(matches!(result, Err(RepositoryError::Validation(_))));

    assert!(repository.find_people_by_name("").await?.is_empty());
    assert!(repository.find_people_by_name("Carol").await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn complete_reports_failure() -> Result<(), Error> {
    let repository = spawn_repository("complete").await?;
    let id: PersonId = "01ARZ3NDEKTSV4RRFFQ69G5FAV".parse()?;

    let outcomes = RefCell::new(vec![]);
    complete(repository.find_edit_then_save(&id), |result| {
        outcomes.borrow_mut().push(result.map(|person| person.id))
    })
    .await;
    complete(repository.create_person(), |result| {
        outcomes.borrow_mut().push(result.map(|person| person.id))
    })
    .await;

    let outcomes = outcomes.into_inner();
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], Err(RepositoryError::NotFound(_))));
    assert!(outcomes[1].is_ok());
    Ok(())
}

#[tokio::test]
async fn people_persist_across_stores() -> Result<(), Error> {
    let repository = spawn_repository("persist").await?;
    let john = repository.create_person().await?;
    let edited = repository.find_edit_then_save(&john.id).await?;

    let store = Store::new();
    store
        .add_instance("persist", "./db/test_persist.json", vec![Person::entity()])
        .await?;
    let reopened = PersonRepository::new(store);
    assert_eq!(reopened.find_person_by_id(&john.id).await?, Some(edited));
    Ok(())
}

#[tokio::test]
async fn failed_commit_leaves_no_trace() -> Result<(), Error> {
    let dir = "./db/test_failed_commit";
    let _ = fs::remove_dir_all(dir);
    let store = Store::new();
    store
        .add_instance("failed_commit", &format!("{}/people.json", dir), vec![Person::entity()])
        .await?;
    let repository = PersonRepository::new(store);
    let john = repository.create_person().await?;

    // Commits write next to the store file, so they fail from here on.
    fs::remove_dir_all(dir)?;

    assert!(repository.create_person().await.is_err());
    assert_eq!(repository.find_people_by_name("John Doe").await?.len(), 1);

    let result = repository.find_edit_then_save(&john.id).await;
    assert!(matches!(result, Err(RepositoryError::Store(_))));
    assert!(repository.find_and_update("John Doe").await.is_err());
    assert!(repository.remove_by_id(&john.id).await.is_err());
    assert_eq!(repository.remove_many_people().await?.deleted_count, 0);
    assert!(repository.remove_many_by_name("John Doe").await.is_err());

    assert_eq!(repository.find_person_by_id(&john.id).await?, Some(john));
    Ok(())
}
