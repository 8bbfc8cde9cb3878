use echoline::store::TrainingStore;
use echoline::{
    DraftSegment, EditorSession, LoopState, MemoryStore, Opts, PlaybackSession, Seek,
    SubmitOutcome, SubmitPolicy, locate_active,
};

async fn commit(session: &mut EditorSession, store: &MemoryStore) -> anyhow::Result<echoline::TrainingItem> {
    match session.submit(store, SubmitPolicy::FoldComposer).await? {
        SubmitOutcome::Committed(item) => Ok(item),
        SubmitOutcome::UnsavedComposer => anyhow::bail!("composer should have been folded"),
    }
}

#[tokio::test]
async fn authored_transcript_plays_back_with_looping() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = EditorSession::new("At the market");

    for (text, end) in [("¿Cuánto cuesta?", 2.0), ("Tres euros.", 5.0), ("Muy bien.", 7.5)] {
        session.draft.set_text(text);
        session.draft.set_end(end);
        session.draft.commit_composer()?;
    }

    let item = commit(&mut session, &store).await?;
    assert_eq!(
        item.segments.iter().map(|s| s.order).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(item.segments[1].start_time, 2.0);

    let mut playback = PlaybackSession::new(item.segments.clone(), &Opts::default());
    assert_eq!(playback.on_tick(2.0).active, Some(1));
    assert_eq!(playback.on_tick(8.0).active, None);

    let entered = playback.select_loop(1);
    assert_eq!(entered.seek_to, Some(Seek { to: 2.0, resume: true }));

    // Every tick at or past the looped end rewinds and keeps the highlight on the loop.
    for t in [4.0, 5.0, 5.1, 6.0] {
        let out = playback.on_tick(t);
        assert_eq!(out.active, Some(1), "t={t}");
        if t >= 5.0 {
            assert_eq!(out.seek_to, Some(Seek { to: 2.0, resume: false }), "t={t}");
        } else {
            assert_eq!(out.seek_to, None);
        }
    }
    assert_eq!(playback.loop_state(), LoopState::Looping(1));

    playback.select_loop(1);
    assert_eq!(playback.loop_state(), LoopState::Idle);
    assert_eq!(playback.on_tick(5.1).active, Some(2));
    Ok(())
}

#[tokio::test]
async fn re_authoring_shrinks_the_list_and_releases_a_dangling_loop() -> anyhow::Result<()> {
    let store = MemoryStore::new();
    let mut session = EditorSession::new("Greetings");
    for (text, start, end) in [("Hallo", 0.0, 1.0), ("Guten Tag", 1.0, 2.0), ("Tschüss", 2.0, 3.0)] {
        session.draft.add_or_update_composer(DraftSegment::new(text, start, end))?;
    }
    let item = commit(&mut session, &store).await?;

    let mut playback = PlaybackSession::new(item.segments.clone(), &Opts::default());
    playback.select_loop(2);

    let mut editing = EditorSession::from_item(&item);
    editing.draft.begin_edit(2);
    editing.draft.remove(0);
    assert_eq!(editing.draft.editing_index(), Some(1));
    assert_eq!(editing.draft.composer().text, "Tschüss");
    editing.draft.cancel_edit();
    editing.draft.remove(1);

    let updated = commit(&mut editing, &store).await?;
    assert_eq!(updated.id, item.id);
    assert_eq!(updated.segments.len(), 1);
    assert_eq!(store.load(item.id).await?, Some(updated.clone()));

    playback.replace_segments(updated.segments);
    assert_eq!(playback.loop_state(), LoopState::Idle);
    assert_eq!(locate_active(playback.segments(), 1.5), Some(0));
    Ok(())
}
