use raytile_compute::{spawn_worker, MainToWorker, Scene, Tile, TestPatternLoader, TestScene, WorkerToMain};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

const SCENE: &str = r#"{"width":8,"height":6,"pattern":{"kind":"checker","cell":3}}"#;

#[test]
fn worker_renders_tiles_matching_the_scene() {
    let (tx, rx) = mpsc::channel();
    let mut unit = spawn_worker(7, Arc::new(TestPatternLoader), move |msg| {
        let _ = tx.send(msg);
    })
    .unwrap();
    let recv = || rx.recv_timeout(Duration::from_secs(5)).unwrap();

    assert_eq!(recv(), WorkerToMain::Loaded);

    unit.post_message(MainToWorker::Init).unwrap();
    unit.post_message(MainToWorker::LoadScene {
        request_id: 1,
        scene: Scene::from(SCENE),
    })
    .unwrap();
    assert_eq!(
        recv(),
        WorkerToMain::SceneLoaded {
            request_id: 1,
            width: 8,
            height: 6
        }
    );

    let tile = Tile::new(3, 2, 5, 4);
    unit.post_message(MainToWorker::RenderTile { request_id: 2, tile })
        .unwrap();

    let WorkerToMain::RenderResult {
        request_id,
        tile: rendered,
        pixels,
    } = recv()
    else {
        panic!("Expected a render result");
    };
    assert_eq!(request_id, 2);
    assert_eq!(rendered, tile);

    let scene = TestScene::parse(SCENE.as_bytes()).unwrap();
    let expected: Vec<u8> = (tile.y..tile.bottom())
        .flat_map(|y| (tile.x..tile.right()).map(move |x| (x, y)))
        .flat_map(|(x, y)| scene.pixel(x, y))
        .collect();
    assert_eq!(pixels, expected);

    unit.terminate();
}

#[test]
fn messages_survive_json_transport() {
    let reply = WorkerToMain::RenderResult {
        request_id: 4,
        tile: Tile::new(0, 0, 1, 1),
        pixels: vec![1, 2, 3],
    };
    let json = serde_json::to_string(&reply).unwrap();
    assert!(json.contains(r#""type":"RenderResult""#));
    assert_eq!(serde_json::from_str::<WorkerToMain>(&json).unwrap(), reply);
}
