use common::AggregateId;
use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Aggregate, CommentIssue, DomainEvent, Entity, Issue, IssueEvent, IssueService, OpenIssue,
    Repository,
};
use event_store::{AppendOptions, EventEnvelope, EventStore, InMemoryEventStore, Version};

fn make_envelope(aggregate_id: AggregateId, version: u64, event: &IssueEvent) -> EventEnvelope {
    EventEnvelope::builder()
        .aggregate_id(aggregate_id)
        .aggregate_type("Issue")
        .event_type(event.event_type())
        .version(Version::new(version))
        .payload(event)
        .unwrap()
        .build()
        .unwrap()
}

fn populated_store(rt: &tokio::runtime::Runtime, comments: u64) -> (InMemoryEventStore, AggregateId) {
    let store = InMemoryEventStore::new();
    let issue_id = AggregateId::new();

    rt.block_on(async {
        let mut events = vec![make_envelope(
            issue_id,
            1,
            &IssueEvent::issue_opened("Benchmark issue"),
        )];
        for v in 2..=comments + 1 {
            let commented = IssueEvent::issue_commented(format!("comment {v}"));
            events.push(make_envelope(issue_id, v, &commented));
        }
        store.append(events, AppendOptions::new()).await.unwrap();
    });

    (store, issue_id)
}

fn bench_execute_and_commit(c: &mut Criterion) {
    c.bench_function("domain/execute_commit_comment", |b| {
        b.iter(|| {
            let mut issue = Issue::new();
            issue
                .execute(&CommentIssue::new(issue.id(), "Any updates on this?"))
                .unwrap();
            issue.commit()
        });
    });

    c.bench_function("domain/execute_blank_comment", |b| {
        let mut issue = Issue::new();
        let cmd = CommentIssue::new(issue.id(), "   ");
        b.iter(|| issue.execute(&cmd).unwrap());
    });
}

fn bench_open_issue(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("domain/open_issue", |b| {
        b.iter(|| {
            rt.block_on(async {
                let service = IssueService::new(InMemoryEventStore::new());
                service
                    .open_issue(OpenIssue::titled("Benchmark issue"))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_comment_issue(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = IssueService::new(InMemoryEventStore::new());
    let cmd = OpenIssue::titled("Benchmark issue");
    let issue_id = cmd.issue_id;
    rt.block_on(async { service.open_issue(cmd).await.unwrap() });

    c.bench_function("domain/comment_issue", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .comment_issue(CommentIssue::new(issue_id, "ping"))
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_replay(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    for comments in [49u64, 99] {
        let (store, issue_id) = populated_store(&rt, comments);

        c.bench_function(&format!("domain/replay_{}_events", comments + 1), |b| {
            b.iter(|| {
                rt.block_on(async {
                    let envelopes = store.get_events_for_aggregate(issue_id).await.unwrap();
                    let mut issue = Issue::with_id(issue_id);
                    for envelope in &envelopes {
                        let event: IssueEvent =
                            serde_json::from_value(envelope.payload.clone()).unwrap();
                        issue.apply(&event);
                    }
                    issue
                })
            });
        });
    }
}

fn bench_find_with_snapshot(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = IssueService::new(InMemoryEventStore::new());
    let cmd = OpenIssue::titled("Snapshotted issue");
    let issue_id = cmd.issue_id;

    rt.block_on(async {
        service.open_issue(cmd).await.unwrap();
        for n in 0..149 {
            service
                .comment_issue(CommentIssue::new(issue_id, format!("comment {n}")))
                .await
                .unwrap();
        }
    });

    c.bench_function("domain/find_150_events_with_snapshot", |b| {
        b.iter(|| {
            rt.block_on(async {
                service
                    .handler()
                    .repository()
                    .find(issue_id)
                    .await
                    .unwrap()
            })
        });
    });
}

criterion_group!(
    benches,
    bench_execute_and_commit,
    bench_open_issue,
    bench_comment_issue,
    bench_replay,
    bench_find_with_snapshot,
);
criterion_main!(benches);
